//! Tests for CLI dispatch and exit code mapping.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use rstest::rstest;
use tempfile::TempDir;

use biogeo::cli::commands::execute_command;
use biogeo::cli::{Cli, CliError};
use biogeo::exitcode;

fn write_tree(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("tree.nwk");
    fs::write(&path, content).expect("write tree file");
    path
}

fn run(args: &[&str]) -> Result<(), CliError> {
    let cli = Cli::try_parse_from(args).expect("valid arguments");
    execute_command(&cli)
}

#[rstest]
#[case("tree")]
#[case("table")]
fn given_valid_tree_when_annotating_then_succeeds(#[case] format: &str) {
    let temp = TempDir::new().unwrap();
    let tree = write_tree(&temp, "((Panthera_leo_AB1_AF,Puma_concolor_AB2_NA),Lynx_lynx_AB3_SA);");
    let dir = temp.path().to_str().unwrap();

    let result = run(&[
        "biogeo",
        "--no-color",
        "-C",
        dir,
        "annotate",
        tree.to_str().unwrap(),
        "--format",
        format,
    ]);

    assert!(result.is_ok(), "{result:?}");
}

#[test]
fn given_malformed_leaf_when_annotating_then_exits_with_data_error() {
    let temp = TempDir::new().unwrap();
    let tree = write_tree(&temp, "(Panthera_leo_AB1_AF,OnlyOneUnderscore_x);");
    let dir = temp.path().to_str().unwrap();

    let err = run(&["biogeo", "-C", dir, "annotate", tree.to_str().unwrap()]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::DATAERR);
    assert!(err.to_string().contains("OnlyOneUnderscore_x"), "{err}");
}

#[test]
fn given_missing_tree_file_when_annotating_then_exits_with_no_input() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_str().unwrap();
    let missing = temp.path().join("absent.nwk");

    let err = run(&["biogeo", "-C", dir, "annotate", missing.to_str().unwrap()]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_unknown_focus_node_when_annotating_then_usage_error() {
    let temp = TempDir::new().unwrap();
    let tree = write_tree(&temp, "(Panthera_leo_AB1_AF,Puma_concolor_AB2_NA);");
    let dir = temp.path().to_str().unwrap();

    let err = run(&["biogeo", "-C", dir, "annotate", tree.to_str().unwrap(), "--node", "nope"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn given_excessive_precision_flag_when_annotating_then_invalid_args() {
    let temp = TempDir::new().unwrap();
    let tree = write_tree(&temp, "(Panthera_leo_AB1_AF,Puma_concolor_AB2_NA);");
    let dir = temp.path().to_str().unwrap();

    let err = run(&["biogeo", "-C", dir, "annotate", tree.to_str().unwrap(), "-p", "15"]).unwrap_err();

    assert!(matches!(err, CliError::InvalidArgs(_)), "{err:?}");
}

#[test]
fn given_tree_when_listing_leaves_then_succeeds() {
    let temp = TempDir::new().unwrap();
    let tree = write_tree(&temp, "(Panthera_leo_AB1_AF,Puma_concolor_AB2_NA);");
    let dir = temp.path().to_str().unwrap();

    assert!(run(&["biogeo", "-C", dir, "leaves", tree.to_str().unwrap()]).is_ok());
}

#[test]
fn given_existing_local_config_when_init_without_force_then_refuses() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().to_str().unwrap();

    run(&["biogeo", "-C", dir, "config", "init"]).expect("first init");
    assert!(temp.path().join(".biogeo.toml").exists());

    let err = run(&["biogeo", "-C", dir, "config", "init"]).unwrap_err();
    assert!(matches!(err, CliError::Usage(_)), "{err:?}");

    run(&["biogeo", "-C", dir, "config", "init", "--force"]).expect("forced init");
}

#[rstest]
#[case(&["biogeo", "annotate", "t.nwk", "--mode", "sideways"])]
#[case(&["biogeo", "annotate", "t.nwk", "--rounding", "sometimes"])]
#[case(&["biogeo", "annotate", "t.nwk", "--ladderize", "asc", "--no-ladderize"])]
fn given_bad_flag_values_when_parsing_then_clap_rejects(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}
