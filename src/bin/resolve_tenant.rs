use clap::{Arg, ArgGroup, Command};
use std::process::ExitCode;
use std::sync::Arc;
use tenant_gateway::config::Config;
use tenant_gateway::db::create_pool;
use tenant_gateway::gateway::{CredentialBundle, TenantGateway};
use tenant_gateway::store::PgCredentialStore;
use tokio_util::sync::CancellationToken;

fn print_bundle(bundle: &CredentialBundle) {
    println!("Organization: {} ({})", bundle.organization_name(), bundle.organization_id());
    println!("Domain:       {}", bundle.domain());
    println!();

    if bundle.is_empty() {
        println!("No usable credentials.");
    } else {
        println!("Credentials:");
        for credential in bundle.credentials() {
            let expires = credential
                .expires_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  {:<8} scope={} key={} token=sha256:{} expires={}",
                credential.system_type,
                credential.scope_id,
                credential.workspace_or_project_key,
                credential.access_token.fingerprint(),
                expires
            );
        }
    }

    if !bundle.warnings().is_empty() {
        println!();
        println!("Warnings:");
        for warning in bundle.warnings() {
            println!(
                "  {:<8} integration={} reason={}",
                warning.system_type, warning.integration_id, warning.reason
            );
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = Command::new("resolve_tenant")
        .version("1.0")
        .about("Resolves a tenant and prints its credential bundle with tokens redacted")
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .value_name("EMAIL")
                .help("Requester email; the tenant is taken from its domain"),
        )
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .value_name("DOMAIN")
                .help("Organization domain, e.g. techcorp.com"),
        )
        .group(
            ArgGroup::new("identity")
                .args(["email", "domain"])
                .required(true),
        )
        .get_matches();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let pool = match create_pool(&config.database()) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };
    let gateway = TenantGateway::new(Arc::new(PgCredentialStore::new(pool)), config.gateway());
    let cancel = CancellationToken::new();

    let result = match (
        matches.get_one::<String>("email"),
        matches.get_one::<String>("domain"),
    ) {
        (Some(email), _) => gateway.credentials_for_identity(email, &cancel).await,
        (None, Some(domain)) => gateway.fetch_credentials_with_cancel(domain, &cancel).await,
        (None, None) => {
            eprintln!("one of --email or --domain is required");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(bundle) => {
            print_bundle(&bundle);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Resolution failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
