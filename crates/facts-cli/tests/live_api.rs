use std::process::Command;

use serde_json::Value;

fn run_live(args: &[&str]) -> (i32, Value, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_facts-cli"))
        .args(args)
        .env("STREAMTITLE_TIMEOUT_SECS", "15")
        .env("STREAMTITLE_LOG", "info")
        .output()
        .expect("run facts-cli live command");

    let status = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let parsed = serde_json::from_str::<Value>(stdout.trim()).expect("stdout should be JSON");
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (status, parsed, stderr)
}

#[test]
#[ignore = "requires network"]
fn live_api_steam_search_finds_stardew_valley() {
    let (status, json, stderr) =
        run_live(&["search", "--source", "steam", "--name", "Stardew Valley"]);

    assert_eq!(status, 0, "search failed: {stderr}");
    assert_eq!(json["result"]["fact"]["source"], "Steam");
    assert!(
        json["result"]["fact"]["name"]
            .as_str()
            .is_some_and(|name| name.contains("Stardew")),
        "unexpected fact: {json}"
    );
}

#[test]
#[ignore = "requires network"]
fn live_api_modrinth_search_returns_modpack() {
    let (status, json, stderr) = run_live(&[
        "search",
        "--source",
        "modrinth",
        "--name",
        "Fabulously Optimized",
    ]);

    assert_eq!(status, 0, "search failed: {stderr}");
    assert_eq!(json["result"]["fact"]["source"], "Modrinth");
    assert!(json["result"]["fact"]["versions"].as_array().is_some());
}

#[test]
#[ignore = "requires network"]
fn live_api_resolve_made_up_name_reports_not_found() {
    let (status, json, stderr) = run_live(&["resolve", "--query", "totally-made-up-modpack-42"]);

    assert_eq!(status, 2, "unexpected status: {stderr}");
    assert_eq!(json["error"]["code"], "user.not_found");
    assert_eq!(
        json["error"]["details"]["original_query"],
        "totally-made-up-modpack-42"
    );
}
