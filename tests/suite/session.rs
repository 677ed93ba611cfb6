//! Whole-session tests: config, engine and rendering against mock backends.

use kiln_config::KilnConfig;
use kiln_engine::{
    App, AppSettings, BuildStatus, ConnectionState, Focus, NonEmptyString, ProjectId,
};
use pretty_assertions::assert_eq;
use ratatui::{Terminal, backend::TestBackend};
use tokio_tungstenite::tungstenite::Message;
use wiremock::MockServer;

use crate::common::{EventServer, event, mount_manifest, start_event_server, todo_manifest};

fn session(http: &MockServer, ws: &EventServer, prompt: &str) -> App {
    let mut config = KilnConfig::default();
    config.server.http_url = http.uri();
    config.server.ws_url = ws.url.clone();
    config.app.ascii_only = true;
    let settings = AppSettings::from_config(&config).unwrap();
    App::new(
        settings,
        ProjectId::new("demo").unwrap(),
        NonEmptyString::new(prompt).unwrap(),
    )
}

async fn pump_until(app: &mut App, what: &str, done: impl Fn(&App) -> bool) {
    let reached = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            app.process_events();
            if done(&*app) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "timed out waiting for {what}");
}

fn screen(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(160, 32)).unwrap();
    terminal.draw(|frame| kiln_tui::draw(frame, app)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

fn build_events() -> Vec<Message> {
    vec![
        event("started", "Creating project"),
        event("file_created", "package.json"),
        event("command", "npm i"),
        event("completed", "done"),
    ]
}

#[tokio::test]
async fn build_renders_conversation_tree_code_and_preview() {
    let http = MockServer::start().await;
    mount_manifest(&http, "demo", "create a todo", 200, todo_manifest(Some("sbx42"))).await;
    let ws = start_event_server(build_events(), false).await;

    let mut app = session(&http, &ws, "create a todo");
    app.connect();
    pump_until(&mut app, "installed build", |app| {
        app.build_status() == BuildStatus::Ready && app.conversation().len() == 4
    })
    .await;

    assert_eq!(ws.accepted_paths(), vec!["/ws/demo".to_string()]);
    assert_eq!(app.connection_state(), ConnectionState::Open);

    let screen = screen(&mut app);
    assert!(!screen.contains("Creating project..."));
    assert!(screen.contains("Created package.json"));
    assert!(screen.contains("npm i"));
    assert!(screen.contains("done"));
    assert!(screen.contains("Files (3 files, 1 folders)"));
    assert!(screen.contains(r#"{ "name": "todo" }"#));
    assert!(screen.contains("https://5173-sbx42.e2b.app"));
    assert!(screen.contains("open"));
}

#[tokio::test]
async fn explorer_navigation_opens_nested_file() {
    let http = MockServer::start().await;
    mount_manifest(&http, "demo", "create a todo", 200, todo_manifest(Some("sbx42"))).await;
    let ws = start_event_server(Vec::new(), false).await;

    let mut app = session(&http, &ws, "create a todo");
    app.connect();
    pump_until(&mut app, "installed build", |app| {
        app.build_status() == BuildStatus::Ready
    })
    .await;
    assert_eq!(
        app.workspace().selection().selected_path(),
        Some("package.json")
    );

    app.set_focus(Focus::Explorer);
    app.move_explorer_cursor(1);
    app.activate_explorer_row(); // expand src
    app.move_explorer_cursor(1);
    app.activate_explorer_row(); // open src/App.tsx

    assert_eq!(
        app.workspace().selection().selected_path(),
        Some("src/App.tsx")
    );
    let screen = screen(&mut app);
    assert!(screen.contains("export default function App() {}"));
    assert!(screen.contains("index.css"));
}

#[tokio::test]
async fn new_prompt_rebuilds_with_fresh_manifest() {
    let http = MockServer::start().await;
    mount_manifest(&http, "demo", "create a todo", 200, todo_manifest(Some("sbx1"))).await;
    mount_manifest(
        &http,
        "demo",
        "add a footer",
        200,
        serde_json::json!({
            "files": [{ "file_path": "src/Footer.tsx", "content": "footer" }],
            "sandbox_id": "sbx2"
        }),
    )
    .await;
    let ws = start_event_server(Vec::new(), false).await;

    let mut app = session(&http, &ws, "create a todo");
    app.connect();
    pump_until(&mut app, "first build", |app| {
        app.build_status() == BuildStatus::Ready
    })
    .await;

    app.enter_insert_mode();
    if let Some(draft) = app.active_buffer_mut() {
        for c in "add a footer".chars() {
            draft.insert_char(c);
        }
    }
    app.submit_input();
    assert_eq!(app.build_status(), BuildStatus::Building);
    assert!(app.workspace().tree().is_empty());

    pump_until(&mut app, "second build", |app| {
        app.build_status() == BuildStatus::Ready
    })
    .await;
    assert_eq!(
        app.workspace().selection().selected_path(),
        Some("src/Footer.tsx")
    );
    assert_eq!(
        app.workspace().preview_endpoint(),
        Some("https://5173-sbx2.e2b.app")
    );
    assert_eq!(app.conversation().len(), 2);
}

#[tokio::test]
async fn rejected_build_stays_building_with_reason() {
    let http = MockServer::start().await;
    mount_manifest(
        &http,
        "demo",
        "create a todo",
        409,
        serde_json::json!({ "error": "A build is already running for this project" }),
    )
    .await;
    let ws = start_event_server(Vec::new(), false).await;

    let mut app = session(&http, &ws, "create a todo");
    app.connect();
    pump_until(&mut app, "failed fetch", |app| {
        app.is_ready() && !app.is_fetching()
    })
    .await;

    assert_eq!(app.build_status(), BuildStatus::Building);
    let screen = screen(&mut app);
    assert!(screen.contains("Error: Build failed: A build is already running"));
    assert!(screen.contains("Building project..."));
}

#[tokio::test]
async fn server_close_is_shown_without_losing_log() {
    let http = MockServer::start().await;
    mount_manifest(&http, "demo", "create a todo", 200, todo_manifest(None)).await;
    let ws = start_event_server(vec![event("thinking", "planning the layout")], true).await;

    let mut app = session(&http, &ws, "create a todo");
    app.connect();
    pump_until(&mut app, "stream closed", |app| {
        app.conversation().len() == 2 && app.connection_state() == ConnectionState::Closed
    })
    .await;

    let screen = screen(&mut app);
    assert!(screen.contains("planning the layout"));
    assert!(screen.contains("closed"));
}
