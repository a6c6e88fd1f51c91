use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("bookstore-cli").unwrap();
    cmd.env("BOOKSTORE_CONFIG_DIR", env!("CARGO_MANIFEST_DIR"))
        .env("BOOKSTORE_ENV", "local")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = cli().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for subcommand in ["serve", "migrate", "config"] {
        assert!(stdout.contains(subcommand), "missing {subcommand} in help");
    }
}

#[test]
fn migrate_against_in_memory_database() {
    let output = cli()
        .arg("migrate")
        .env("BOOKSTORE_DATABASE__BACKEND", "sqlite")
        .env("BOOKSTORE_DATABASE__PATH", ":memory:")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("1 migrations registered"));
}

#[test]
fn unknown_environment_fails() {
    cli().arg("config").env("BOOKSTORE_ENV", "qa").assert().failure();
}
