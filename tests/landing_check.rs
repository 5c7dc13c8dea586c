//! End-to-end check of the served landing page

use gitslice_landing::check::{self, Script, StepStatus};
use gitslice_landing::server::{LandingServer, ServerConfig};
use gitslice_landing::{BrowserConfig, Engine, Locator, NameMatch, Navigation};
use tiny_http::{Response, Server};

fn engine() -> impl Engine {
    gitslice_landing::new_engine(BrowserConfig {
        timeout_ms: 5000,
        ..Default::default()
    })
    .expect("Failed to create engine")
}

/// Serve a fixed document on an ephemeral port for as many requests as arrive
fn serve_html(html: String) -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = Response::from_string(html.clone()).with_header(
                "Content-Type: text/html; charset=utf-8"
                    .parse::<tiny_http::Header>()
                    .unwrap(),
            );
            let _ = request.respond(response);
        }
    });
    format!("http://{}/", addr)
}

#[test]
fn landing_check_passes_against_served_page() {
    let handle = LandingServer::bind(ServerConfig::ephemeral()).unwrap().spawn();
    let mut engine = engine();

    let report = check::run_script(&mut engine, &handle.base_url(), &check::landing_script())
        .expect("valid script");
    assert!(report.passed, "{}", report);
    assert_eq!(report.skipped, 0);

    engine.close().unwrap();
    handle.shutdown();
}

#[test]
fn anchor_links_scroll_to_their_sections() {
    let handle = LandingServer::bind(ServerConfig::ephemeral()).unwrap().spawn();
    let mut engine = engine();
    engine.load_url(&handle.base_url()).unwrap();

    let nav = engine
        .click(&Locator::link(NameMatch::contains("explore the workflow")))
        .unwrap();
    assert_eq!(
        nav,
        Navigation::Fragment {
            url: format!("{}#features", handle.base_url()),
            target: "features".into()
        }
    );
    assert!(engine.any_visible(&Locator::css("#features")).unwrap());

    engine
        .click(&Locator::link(NameMatch::contains("see how it works")))
        .unwrap();
    assert_eq!(engine.scroll_target(), Some("overview"));
    assert!(engine.any_visible(&Locator::css("#overview")).unwrap());
}

#[test]
fn contact_link_is_not_followed() {
    let handle = LandingServer::bind(ServerConfig::ephemeral()).unwrap().spawn();
    let mut engine = engine();
    engine.load_url(&handle.base_url()).unwrap();

    let nav = engine
        .click(&Locator::link(NameMatch::exact("Contact the team")))
        .unwrap();
    assert_eq!(
        nav,
        Navigation::External {
            url: "mailto:team@gitslice.dev".into()
        }
    );
}

#[test]
fn hidden_features_section_fails_at_its_assertion() {
    let page = gitslice_landing::page::render_page().unwrap().replace(
        "<section id=\"features\" class=\"section features\">",
        "<section id=\"features\" class=\"section features\" hidden>",
    );
    let base = serve_html(page);
    let mut engine = engine();

    let script = check::landing_script();
    let report = check::run_script(&mut engine, &base, &script).unwrap();
    assert!(!report.passed);

    let failure = report.failure().expect("a failed step");
    assert_eq!(failure.step, "expect css=#features to be visible");
    assert!(matches!(&failure.status, StepStatus::Failed(m) if m.contains("not visible")));
    // Nothing after the failing step ran
    assert_eq!(report.outcomes.len(), failure.index);
    assert_eq!(report.skipped, script.steps().len() - failure.index);
}

#[test]
fn unreachable_site_fails_the_goto_step() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let server = Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap().port()
    };
    let mut engine = engine();
    let report = check::run_script(
        &mut engine,
        &format!("http://127.0.0.1:{}/", port),
        &check::landing_script(),
    )
    .unwrap();
    assert!(!report.passed);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].step, "goto /");
}

#[test]
fn custom_script_against_fixture() {
    let base = serve_html(
        r##"<html><body>
            <nav><a href="#faq">FAQ</a></nav>
            <section id="faq" style="display: none">Answers</section>
        </body></html>"##
            .to_string(),
    );
    let script = Script::new("fixture")
        .goto("/")
        .navigate(
            Locator::link(NameMatch::exact("FAQ")),
            Locator::css("#faq"),
        )
        .expect_scrolled_to("faq");

    let mut engine = engine();
    let report = check::run_script(&mut engine, &base, &script).unwrap();
    assert!(!report.passed);
    assert_eq!(report.failure().unwrap().index, 3);
    assert_eq!(report.skipped, 1);
    // The click itself succeeded before the assertion failed
    assert_eq!(engine.scroll_target(), Some("faq"));
}
