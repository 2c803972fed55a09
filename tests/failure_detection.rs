//! The harness must actually catch broken pages, not just bless good ones.

use pagecheck::checks::{self, CheckContext, CheckId, Outcome};
use pagecheck::static_backend::StaticSurface;
use pagecheck::HarnessConfig;
use tiny_http::{Response, Server};

/// A page breaking one rule per check family: duplicate ids, a skipped
/// heading level, an unlabeled image, a fixed-width element wider than the
/// narrow viewports, an un-isolated _blank link, and no contact address.
const BROKEN_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
<title>Broken</title>
<style>
body { margin: 0; background: #ffffff; color: #cccccc; }
.container { max-width: 640px; margin: 0 auto; }
.banner { width: 1200px; height: 40px; background: #eeeeee; }
h1 { font-size: 42px; }
</style>
</head>
<body>
<div class="container">
  <h1 id="top">Broken</h1>
  <h3>Skipped a level</h3>
  <p id="top">Duplicate identifier here.</p>
  <img src="banner.png">
  <div class="banner"></div>
  <a href="https://example.com" target="_blank">elsewhere</a>
  <a href="#missing">dangling fragment</a>
</div>
</body>
</html>"##;

fn serve_broken() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    std::thread::spawn(move || {
        while let Ok(request) = server.recv() {
            let _ = request.respond(Response::from_string(BROKEN_PAGE));
        }
    });
    format!("http://{addr}")
}

fn run(id: CheckId, base_url: &str) -> Outcome {
    let mut surface = StaticSurface::new(HarnessConfig::default()).expect("create surface");
    let ctx = CheckContext {
        base_url: base_url.to_string(),
        baseline_dir: std::env::temp_dir().join("pagecheck-broken-baselines"),
        update_baselines: false,
    };
    checks::dispatch(id, &mut surface, &ctx)
}

fn mismatch_facts(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Failed { mismatches } => mismatches.iter().map(|m| m.fact.clone()).collect(),
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[test]
fn structure_flags_duplicate_ids_and_skipped_heading() {
    let base_url = serve_broken();
    let facts = mismatch_facts(&run(CheckId::Structure, &base_url));
    assert!(
        facts.iter().any(|f| f.contains("id \"top\"")),
        "missing duplicate-id mismatch: {facts:?}"
    );
    assert!(
        facts.iter().any(|f| f.contains("heading level after h1")),
        "missing heading-order mismatch: {facts:?}"
    );
}

#[test]
fn accessibility_flags_lang_alt_and_contrast() {
    let base_url = serve_broken();
    let facts = mismatch_facts(&run(CheckId::Accessibility, &base_url));
    assert!(
        facts.iter().any(|f| f.contains("html-has-lang")),
        "missing lang violation: {facts:?}"
    );
    assert!(
        facts.iter().any(|f| f.contains("image-alt")),
        "missing alt violation: {facts:?}"
    );
    // #cccccc text on #ffffff is roughly 1.6:1.
    assert!(
        facts.iter().any(|f| f.contains("color-contrast")),
        "missing contrast violation: {facts:?}"
    );
}

#[test]
fn links_flags_isolation_fragment_and_missing_contact() {
    let base_url = serve_broken();
    let facts = mismatch_facts(&run(CheckId::Links, &base_url));
    assert!(
        facts.iter().any(|f| f.contains("rel of")),
        "missing isolation mismatch: {facts:?}"
    );
    assert!(
        facts.iter().any(|f| f.contains("fragment target")),
        "missing fragment mismatch: {facts:?}"
    );
    assert!(
        facts.iter().any(|f| f == "contact link"),
        "missing contact mismatch: {facts:?}"
    );
}

#[test]
fn responsive_flags_overflow_at_narrow_viewports() {
    let base_url = serve_broken();
    let facts = mismatch_facts(&run(CheckId::Responsive, &base_url));
    assert!(
        facts.iter().any(|f| f.contains("horizontal overflow @ mobile")),
        "missing overflow mismatch: {facts:?}"
    );
    // The page has no .info-row, so the direction fact cannot be measured.
    assert!(
        facts.iter().any(|f| f.contains("flex-direction of .info-row")),
        "missing direction mismatch: {facts:?}"
    );
}

#[test]
fn unreachable_server_reports_errors_not_failures() {
    // Nothing listens on this port.
    let outcome = run(CheckId::Structure, "http://127.0.0.1:9/");
    assert!(
        matches!(outcome, Outcome::Errored { .. }),
        "expected an infrastructure error, got {outcome:?}"
    );
}
