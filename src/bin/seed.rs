//! Seed a development database with two users, a friendship and a group,
//! then print the bearer tokens to connect with.

use clap::Parser;

use ventichat::auth;
use ventichat::db;
use ventichat::models::user::CreateUser;

#[derive(Parser)]
#[command(name = "venti-seed")]
struct Args {
    #[arg(long, default_value = "sqlite:ventichat.db?mode=rwc")]
    database_url: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let pool = db::create_pool(&args.database_url)
        .await
        .expect("failed to open database");

    let alice = db::users::create_user(
        &pool,
        &CreateUser {
            username: "alice".to_string(),
            nickname: None,
        },
    )
    .await
    .expect("failed to create user alice (already seeded?)");

    let bob = db::users::create_user(
        &pool,
        &CreateUser {
            username: "bob".to_string(),
            nickname: Some("Bob".to_string()),
        },
    )
    .await
    .expect("failed to create user bob");

    let alice_token = auth::issue_token(&pool, alice.id, 30)
        .await
        .expect("failed to issue token");
    let bob_token = auth::issue_token(&pool, bob.id, 30)
        .await
        .expect("failed to issue token");

    let friendship = db::friends::create_friendship(&pool, alice.id, bob.id)
        .await
        .expect("failed to create friendship");

    let group = db::groups::create_group(&pool, "lounge", alice.id)
        .await
        .expect("failed to create group");
    db::groups::add_member(&pool, group, bob.id, "member")
        .await
        .expect("failed to add member");

    eprintln!();
    eprintln!("  \x1b[1;36mventi-seed\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2malice\x1b[0m        id {}  token {}", alice.id, alice_token);
    eprintln!("  \x1b[2mbob\x1b[0m          id {}  token {}", bob.id, bob_token);
    eprintln!("  \x1b[2mfriend room\x1b[0m  {{\"type\":\"friend\",\"id\":{friendship}}}");
    eprintln!("  \x1b[2mgroup room\x1b[0m   {{\"type\":\"group\",\"id\":{group}}}");
    eprintln!();
}
