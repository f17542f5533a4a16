use clap::CommandFactory;

use super::*;

const DB: [&str; 3] = ["harmony-cli", "--database-url", "postgres://localhost/harmony"];

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(DB.iter().chain(args)).expect("expected valid cli args")
}

#[test]
fn parses_migrate_command() {
    let cli = parse(&["migrate"]);
    assert_eq!(cli.database_url, "postgres://localhost/harmony");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn seed_defaults_to_bundled_catalog() {
    let cli = parse(&["seed", "--owner-password", "rahasia"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Seed { ref file, ref owner_password })
            if file == &PathBuf::from("config/catalog.yaml") && owner_password == "rahasia"
    ));
}

#[test]
fn seed_accepts_custom_file() {
    let cli = parse(&["seed", "--file", "/tmp/menu.yaml", "--owner-password", "rahasia"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Seed { ref file, .. }) if file == &PathBuf::from("/tmp/menu.yaml")
    ));
}

#[test]
fn parses_create_superadmin() {
    let cli = parse(&[
        "create-superadmin",
        "--name",
        "Root",
        "--email",
        "root@harmony.id",
        "--password",
        "supersecret",
    ]);
    assert!(matches!(
        cli.command,
        Some(Commands::CreateSuperadmin { ref name, ref email, .. })
            if name == "Root" && email == "root@harmony.id"
    ));
}

#[test]
fn create_superadmin_requires_email() {
    let result = Cli::try_parse_from(
        DB.iter()
            .chain(&["create-superadmin", "--name", "Root", "--password", "supersecret"]),
    );
    assert!(result.is_err());
}

#[test]
fn parses_pending_requests() {
    let cli = parse(&["pending-requests"]);
    assert!(matches!(cli.command, Some(Commands::PendingRequests)));
}

#[test]
fn no_command_is_none() {
    let cli = parse(&[]);
    assert!(cli.command.is_none());
}

#[test]
fn short_passwords_are_rejected() {
    assert!(check_password("12345").is_err());
    assert!(check_password("123456").is_ok());
}

#[test]
fn truncate_keeps_short_values_and_marks_long_ones() {
    assert_eq!(truncate("Kopi Senja", 28), "Kopi Senja");
    assert_eq!(truncate("Warung Makan Sederhana Bu Siti", 12), "Warung Ma...");
}

#[test]
fn help_names_the_product() {
    let about = Cli::command().get_about().map(ToString::to_string);
    assert_eq!(
        about.as_deref(),
        Some("Hunger's Harmony operator command line interface")
    );
}
