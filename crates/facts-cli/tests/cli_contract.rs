use std::process::{Command, Output};

use facts_cli::model::{Fact, GameFact, GenerationHandoff, ModpackFact, Preferences};
use facts_cli::normalize::{NotFound, build_not_found};
use serde_json::Value;

const CLEARED_ENV: [&str; 4] = [
    "GEMINI_API_KEY",
    "CURSEFORGE_API_KEY",
    "STREAMTITLE_TIMEOUT_SECS",
    "STEAM_COUNTRY_CODE",
];

fn run_cli(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_facts-cli"));
    cmd.args(args);
    for key in CLEARED_ENV {
        cmd.env_remove(key);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("run facts-cli")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).expect("stdout should be JSON")
}

#[test]
fn cli_contract_help_lists_subcommands() {
    let output = run_cli(&["--help"], &[]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["resolve", "expand", "search"] {
        assert!(stdout.contains(command), "help missing {command}");
    }
}

#[test]
fn cli_contract_blank_query_is_invalid_input() {
    let output = run_cli(&["resolve", "--query", "   "], &[]);
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["schema_version"], "v1");
    assert_eq!(json["command"], "facts.resolve");
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "user.invalid_input");
    assert_eq!(json["error"]["details"]["kind"], "user");
    assert_eq!(json["error"]["details"]["exit_code"], 2);
}

#[test]
fn cli_contract_invalid_timeout_is_invalid_config() {
    let output = run_cli(
        &["expand", "--query", "bg3"],
        &[("STREAMTITLE_TIMEOUT_SECS", "soon")],
    );
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["command"], "facts.expand");
    assert_eq!(json["error"]["code"], "user.invalid_config");
    assert!(
        json["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("STREAMTITLE_TIMEOUT_SECS"))
    );
}

#[test]
fn cli_contract_expand_without_gemini_key_echoes_query() {
    let output = run_cli(&["expand", "--query", "  bg3 "], &[]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["result"]["original_query"], "  bg3 ");
    assert_eq!(json["result"]["canonical_name"], "bg3");
    assert_eq!(json["result"]["expanded"], false);
}

#[test]
fn cli_contract_curseforge_search_without_key_is_config_error() {
    let output = run_cli(&["search", "--source", "curseforge", "--name", "ftb"], &[]);
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["command"], "facts.search");
    assert_eq!(json["error"]["code"], "user.invalid_config");
}

#[test]
fn cli_contract_unknown_source_is_rejected_by_parser() {
    let output = run_cli(&["search", "--source", "itch", "--name", "celeste"], &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn cli_contract_handoff_contains_required_fields() {
    let handoff = GenerationHandoff {
        facts: Fact::StorefrontCatalog(GameFact {
            name: "Baldur's Gate 3".to_string(),
            description: "Gather your party.".to_string(),
            genres: vec!["RPG".to_string()],
            developers: vec!["Larian Studios".to_string()],
        }),
        preferences: Preferences::default(),
        original_query: "bg3".to_string(),
        canonical_name: "Baldur's Gate 3".to_string(),
        resolved_at: "2026-03-01T12:00:00Z".to_string(),
    };

    let value = serde_json::to_value(handoff).expect("json");

    for field in [
        "facts",
        "preferences",
        "original_query",
        "canonical_name",
        "resolved_at",
    ] {
        assert!(value.get(field).is_some(), "missing field: {field}");
    }
    for field in ["source", "name", "description", "genres", "developers"] {
        assert!(value["facts"].get(field).is_some(), "missing fact field: {field}");
    }
    for field in ["platform", "language", "description_length"] {
        assert!(value["preferences"].get(field).is_some(), "missing preference: {field}");
    }
}

#[test]
fn cli_contract_registry_facts_use_registry_source_tags() {
    let pack = ModpackFact {
        title: "Feed The Beast".to_string(),
        description: "Classic pack.".to_string(),
        categories: vec!["tech".to_string()],
        versions: vec!["1.12.2".to_string()],
        downloads: 42,
    };

    let modrinth = serde_json::to_value(Fact::PackageRegistry(pack.clone())).expect("json");
    let curseforge = serde_json::to_value(Fact::ModRegistry(pack)).expect("json");

    assert_eq!(modrinth["source"], "Modrinth");
    assert_eq!(curseforge["source"], "CurseForge");
    assert_eq!(curseforge["downloads"], 42);
}

#[test]
fn cli_contract_not_found_payload_round_trips() {
    let not_found = build_not_found(
        "Nonexistent Game XYZ",
        "nonexistent game xyz",
        &Preferences::default(),
        &[],
        Vec::new(),
    );

    let value = serde_json::to_value(&not_found).expect("json");
    assert!(value.get("source_trace").is_none());
    assert_eq!(value["fallback_content"]["tags"][0], "error");

    let decoded: NotFound = serde_json::from_value(value).expect("decode");
    assert_eq!(not_found, decoded);
}
