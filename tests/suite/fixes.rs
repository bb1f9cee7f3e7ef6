//! Fix listing and resolution against a loaded workspace.

use std::path::PathBuf;

use quay_codefix::FixService;
use quay_types::{DiagnosticRef, DocumentId, Position, Range, apply_text_edits};
use quay_workspace::SessionOutcome;

use crate::common::{FakeRestore, ScriptedEngine, context};

const PROGRAM: &str = "namespace App;\n\nvar json = JsonSerializer.Serialize(1);\n";

fn project(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join("quay-fixes")
        .join(name)
        .join(format!("{name}.csproj"))
}

fn missing_type() -> DiagnosticRef {
    DiagnosticRef::new("CS0246", Range::new(Position::new(2, 11), Position::new(2, 25)))
}

#[tokio::test]
async fn listed_fix_resolves_to_edits_for_the_loaded_document() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine.add_project(&app, "Program.cs", PROGRAM);
    let (workspace, _events) = context(&engine, &restore);
    workspace.add_projects([&app]);
    workspace.reload().wait().await;

    let fixes = FixService::new(workspace.engine(), workspace.snapshot_watch());
    let document = DocumentId::new(app.parent().unwrap().join("Program.cs"));
    let listed = fixes.list_fixes(&document, &[missing_type()]).await;

    let titles: Vec<&str> = listed.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["using System.Text.Json;", "using Newtonsoft.Json;"]);
    assert!(listed[0].is_preferred);

    let edits = fixes.resolve_fix(&listed[1].suggestion).await;
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].document, document);
    assert_eq!(
        apply_text_edits(PROGRAM, &edits[0].edits),
        format!("using Newtonsoft.Json;\n{PROGRAM}")
    );

    // Resolution is a preview; the workspace itself is unchanged.
    let current = workspace.snapshot();
    assert_eq!(current.document(&document).map(|d| d.text()), Some(PROGRAM));
}

#[tokio::test]
async fn fixes_are_empty_before_anything_loads() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine.add_project(&app, "Program.cs", PROGRAM);
    let (workspace, _events) = context(&engine, &restore);

    let fixes = FixService::new(workspace.engine(), workspace.snapshot_watch());
    let document = DocumentId::new(app.parent().unwrap().join("Program.cs"));
    assert!(fixes.list_fixes(&document, &[missing_type()]).await.is_empty());
}

#[tokio::test]
async fn fix_requests_are_not_blocked_by_a_running_reload() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let (app, web) = (project("App"), project("Web"));
    engine.add_project(&app, "Program.cs", PROGRAM);
    engine.add_project(&web, "Startup.cs", "class Startup {}\n");
    let (workspace, _events) = context(&engine, &restore);
    workspace.add_projects([&app]);
    workspace.reload().wait().await;

    // Hold the next session inside its load of Web.
    workspace.add_projects([&web]);
    let gate = engine.hold(&web);
    let session = workspace.load();
    gate.entered.notified().await;

    let fixes = FixService::new(workspace.engine(), workspace.snapshot_watch());
    let document = DocumentId::new(app.parent().unwrap().join("Program.cs"));
    let listed = fixes.list_fixes(&document, &[missing_type()]).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(fixes.resolve_fix(&listed[0].suggestion).await.len(), 1);

    gate.release.notify_one();
    assert_eq!(
        session.wait().await,
        SessionOutcome::Completed { loaded: 1, failed: 0 }
    );
}

#[tokio::test]
async fn fix_for_diagnostic_without_suggestions_is_empty() {
    let engine = ScriptedEngine::new();
    let restore = FakeRestore::new();
    let app = project("App");
    engine.add_project(&app, "Program.cs", PROGRAM);
    let (workspace, _events) = context(&engine, &restore);
    workspace.add_projects([&app]);
    workspace.reload().wait().await;

    let fixes = FixService::new(workspace.engine(), workspace.snapshot_watch());
    let document = DocumentId::new(app.parent().unwrap().join("Program.cs"));
    let range = Range::new(Position::new(0, 0), Position::new(0, 1));
    let unknown = DiagnosticRef::new("CS1002", range);
    assert!(fixes.list_fixes(&document, &[unknown]).await.is_empty());
}
