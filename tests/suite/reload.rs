//! Reload sessions driven through `WorkspaceContext`.

use std::path::PathBuf;

use quay_config::WorkspaceConfig;
use quay_workspace::{ProjectPhase, ReloadEvent, SessionOutcome, WorkspaceContext};

use crate::common::{
    Call, FakeRestore, ScriptedEngine, completed_count, context, drain, failure_messages,
};

fn project(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("quay-reload")
        .join(name)
        .join(format!("{name}.csproj"))
}

#[tokio::test]
async fn reload_restores_and_loads_projects_in_order() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "class Program {}\n");
    engine.add_project(&web, "Startup.cs", "class Startup {}\n");
    let (workspace, mut events) = context(&engine, &restore);

    assert_eq!(workspace.add_projects([&app, &web]), 2);
    let outcome = workspace.reload().wait().await;

    assert_eq!(outcome, SessionOutcome::Completed { loaded: 2, failed: 0 });
    assert_eq!(restore.calls(), vec![app.clone(), web.clone()]);
    assert_eq!(
        engine.calls(),
        vec![Call::Close, Call::Load(app.clone()), Call::Load(web.clone())]
    );

    let snapshot = workspace.snapshot();
    assert_eq!(snapshot.project_count(), 2);
    assert_eq!(snapshot.document_count(), 2);

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(ReloadEvent::LoadingStarted { generation: 1 })
    ));
    assert!(matches!(
        events.last(),
        Some(ReloadEvent::Completed { generation: 1 })
    ));
    let phases: Vec<ProjectPhase> = events
        .iter()
        .filter_map(|event| match event {
            ReloadEvent::Progress { project, phase, .. } if *project == app => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            ProjectPhase::RestoreStarted,
            ProjectPhase::RestoreCompleted,
            ProjectPhase::LoadStarted,
            ProjectPhase::LoadCompleted,
        ]
    );
    assert!(failure_messages(&events).is_empty());
}

#[tokio::test]
async fn snapshot_grows_as_each_project_loads() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "class Program {}\n");
    engine.add_project(&web, "Startup.cs", "class Startup {}\n");
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects([&app, &web]);

    workspace.reload().wait().await;

    let sizes: Vec<usize> = drain(&mut events)
        .iter()
        .filter_map(|event| match event {
            ReloadEvent::SnapshotUpdated { snapshot, .. } => Some(snapshot.project_count()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![0, 1, 2]);
    assert_eq!(workspace.snapshot_watch().borrow().project_count(), 2);
}

#[tokio::test]
async fn restore_failure_is_reported_and_project_still_loads() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "");
    engine.add_project(&web, "Startup.cs", "");
    restore.fail(&app, 1);
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects([&app, &web]);

    let outcome = workspace.reload().wait().await;

    assert_eq!(outcome, SessionOutcome::Completed { loaded: 2, failed: 0 });
    let events = drain(&mut events);
    assert_eq!(
        failure_messages(&events),
        vec!["Failed to restore App. Error code 1.".to_string()]
    );
    assert!(
        events
            .iter()
            .any(|event| matches!(event, ReloadEvent::RestoreFailed { .. }))
    );
    assert_eq!(engine.loads(), vec![app, web]);
}

#[tokio::test]
async fn load_failure_is_reported_and_session_continues() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (broken, web) = (project("Broken"), project("Web"));
    engine.fail_load(&broken);
    engine.add_project(&web, "Startup.cs", "");
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects([&broken, &web]);

    let outcome = workspace.reload().wait().await;

    assert_eq!(outcome, SessionOutcome::Completed { loaded: 1, failed: 1 });
    let events = drain(&mut events);
    let messages = failure_messages(&events);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Broken.csproj"), "{messages:?}");
    assert!(messages[0].contains("scripted failure"), "{messages:?}");
    assert_eq!(completed_count(&events), 1);
    assert!(workspace.snapshot().contains_project(&web));
    assert!(!workspace.snapshot().contains_project(&broken));
}

#[tokio::test]
async fn failures_past_the_cap_are_not_surfaced() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let projects: Vec<PathBuf> = (0..20).map(|i| project(&format!("P{i:02}"))).collect();
    for path in &projects {
        engine.fail_load(path);
    }
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects(&projects);

    let outcome = workspace.reload().wait().await;
    assert_eq!(outcome, SessionOutcome::Completed { loaded: 0, failed: 20 });
    assert_eq!(failure_messages(&drain(&mut events)).len(), 15);
    assert_eq!(workspace.reporter().reported(), 15);

    // The cap spans sessions of one context.
    workspace.reload().wait().await;
    assert!(failure_messages(&drain(&mut events)).is_empty());
    assert_eq!(engine.loads().len(), 40);
}

#[tokio::test]
async fn a_new_context_starts_with_a_fresh_error_budget() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let projects: Vec<PathBuf> = (0..16).map(|i| project(&format!("Q{i:02}"))).collect();
    for path in &projects {
        engine.fail_load(path);
    }

    for _ in 0..2 {
        let (workspace, mut events) = context(&engine, &restore);
        workspace.add_projects(&projects);
        workspace.reload().wait().await;
        assert_eq!(failure_messages(&drain(&mut events)).len(), 15);
    }
}

#[tokio::test]
async fn second_reload_cancels_the_first() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "");
    engine.add_project(&web, "Startup.cs", "");
    let gate = engine.hold(&app);
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects([&app, &web]);

    let first = workspace.reload();
    gate.entered.notified().await;
    let second = workspace.reload();

    assert_eq!(first.wait().await, SessionOutcome::Cancelled);
    assert_eq!(
        second.wait().await,
        SessionOutcome::Completed { loaded: 2, failed: 0 }
    );

    // The first session never got past its held load of App.
    assert_eq!(
        engine.calls(),
        vec![
            Call::Close,
            Call::Load(app.clone()),
            Call::Close,
            Call::Load(app.clone()),
            Call::Load(web.clone()),
        ]
    );
    assert_eq!(restore.calls(), vec![app.clone(), app, web]);

    let events = drain(&mut events);
    assert!(failure_messages(&events).is_empty());
    let completed: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            ReloadEvent::Completed { generation } => Some(*generation),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![2]);
}

#[tokio::test]
async fn shutdown_cancels_silently() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine.add_project(&app, "Program.cs", "");
    let gate = engine.hold(&app);
    let (workspace, mut events) = context(&engine, &restore);
    workspace.add_projects([&app]);

    let session = workspace.reload();
    gate.entered.notified().await;
    workspace.shutdown().await;

    assert_eq!(session.wait().await, SessionOutcome::Cancelled);
    let events = drain(&mut events);
    assert_eq!(completed_count(&events), 0);
    assert!(failure_messages(&events).is_empty());
    assert!(workspace.coordinator().current_session().is_none());
}

#[tokio::test]
async fn load_adds_only_projects_missing_from_the_snapshot() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "");
    engine.add_project(&web, "Startup.cs", "");
    let (workspace, _events) = context(&engine, &restore);

    workspace.add_projects([&app]);
    workspace.reload().wait().await;
    workspace.add_projects([&web]);
    let outcome = workspace.load().wait().await;

    assert_eq!(outcome, SessionOutcome::Completed { loaded: 1, failed: 0 });
    assert_eq!(
        engine.calls(),
        vec![Call::Close, Call::Load(app.clone()), Call::Load(web.clone())]
    );
    assert_eq!(workspace.snapshot().project_count(), 2);
}

#[tokio::test]
async fn removed_project_is_dropped_by_the_next_reload() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", "");
    engine.add_project(&web, "Startup.cs", "");
    let (workspace, _events) = context(&engine, &restore);
    workspace.add_projects([&app, &web]);
    workspace.reload().wait().await;

    assert_eq!(workspace.remove_projects([&web]), 1);
    assert_eq!(workspace.remove_projects([&web]), 0);
    workspace.reload().wait().await;

    let snapshot = workspace.snapshot();
    assert!(snapshot.contains_project(&app));
    assert!(!snapshot.contains_project(&web));
}

#[tokio::test]
async fn compile_without_restore_follows_config() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine.add_project(&app, "Program.cs", "");
    let config = WorkspaceConfig {
        restore_before_load: false,
        compile_after_load: true,
        ..WorkspaceConfig::default()
    };
    let (workspace, mut events) =
        WorkspaceContext::new(&config, engine.clone(), restore.clone()).unwrap();
    workspace.add_projects([&app]);

    workspace.reload().wait().await;

    assert!(restore.calls().is_empty());
    assert_eq!(
        engine.calls(),
        vec![Call::Close, Call::Load(app), Call::Compile("App".to_string())]
    );
    let phases: Vec<ProjectPhase> = drain(&mut events)
        .iter()
        .filter_map(|event| match event {
            ReloadEvent::Progress { phase, .. } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            ProjectPhase::LoadStarted,
            ProjectPhase::LoadCompleted,
            ProjectPhase::CompileStarted,
            ProjectPhase::CompileCompleted,
        ]
    );
}

#[tokio::test]
async fn contexts_are_independent() {
    let engine_a = ScriptedEngine::new();
    let engine_b = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine_a.add_project(&app, "Program.cs", "");
    let (first, _first_events) = context(&engine_a, &restore);
    let (second, _second_events) = context(&engine_b, &restore);

    first.add_projects([&app]);
    let first_session = first.reload();
    let second_session = second.reload();

    assert_eq!(first_session.generation(), 1);
    assert_eq!(second_session.generation(), 1);
    assert_eq!(
        first_session.wait().await,
        SessionOutcome::Completed { loaded: 1, failed: 0 }
    );
    assert_eq!(
        second_session.wait().await,
        SessionOutcome::Completed { loaded: 0, failed: 0 }
    );
    assert!(second.tracked_projects().is_empty());
}
