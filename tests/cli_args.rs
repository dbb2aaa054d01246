//! CLI argument parsing tests.

use clap::Parser;
use snykapi::cli::{parse_key_val, Cli, Command};

#[test]
fn test_cli_parses_list_subcommand() {
    let cli = Cli::parse_from(["snykapi", "list", "orgs"]);

    assert!(!cli.json);
    assert!(!cli.verbose);
    match cli.command {
        Command::List {
            resource,
            per_page,
            limit,
            params,
            ..
        } => {
            assert_eq!(resource, "orgs");
            assert_eq!(per_page, None);
            assert_eq!(limit, None);
            assert!(params.is_empty());
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_cli_parses_list_with_options() {
    let cli = Cli::parse_from([
        "snykapi",
        "list",
        "targets",
        "--org",
        "org-1",
        "--limit",
        "50",
        "--param",
        "display_name=api",
        "--param",
        "is_private=false",
    ]);

    match cli.command {
        Command::List {
            resource,
            org,
            limit,
            params,
            ..
        } => {
            assert_eq!(resource, "targets");
            assert_eq!(org.as_deref(), Some("org-1"));
            assert_eq!(limit, Some(50));
            assert_eq!(
                params,
                vec![
                    ("display_name".to_string(), "api".to_string()),
                    ("is_private".to_string(), "false".to_string()),
                ]
            );
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_cli_parses_get_subcommand() {
    let cli = Cli::parse_from(["snykapi", "get", "projects", "prj-1", "--org", "org-1"]);

    match cli.command {
        Command::Get { resource, id, org } => {
            assert_eq!(resource, "projects");
            assert_eq!(id, "prj-1");
            assert_eq!(org.as_deref(), Some("org-1"));
        }
        _ => panic!("Expected Get command"),
    }
}

#[test]
fn test_cli_parses_me_and_resources() {
    assert!(matches!(Cli::parse_from(["snykapi", "me"]).command, Command::Me));
    assert!(matches!(
        Cli::parse_from(["snykapi", "resources"]).command,
        Command::Resources
    ));
}

#[test]
fn test_cli_global_flags_after_subcommand() {
    let cli = Cli::parse_from(["snykapi", "list", "orgs", "--json", "-v"]);

    assert!(cli.json);
    assert!(cli.verbose);
}

#[test]
fn test_cli_rejects_malformed_param() {
    let result = Cli::try_parse_from(["snykapi", "list", "orgs", "--param", "novalue"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_get_requires_id() {
    let result = Cli::try_parse_from(["snykapi", "get", "projects"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_key_val_keeps_equals_in_value() {
    assert_eq!(
        parse_key_val("q=a=b").unwrap(),
        ("q".to_string(), "a=b".to_string())
    );
    assert!(parse_key_val("=x").is_err());
}
