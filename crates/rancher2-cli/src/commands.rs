//! Subcommand execution.

use std::path::Path;

use anyhow::{bail, Context};
use rancher2_core::ResourceId;
use rancher2_provider::data::{ProjectQuery, TokenQuery};
use rancher2_provider::{ManagedResource, Provider};
use serde_json::{json, Value};

use super::{Command, Lookup};

/// Registry prefix shared by every resource and data source name.
const TYPE_PREFIX: &str = "rancher2_";

/// Run a subcommand and print its result.
pub async fn run(provider: &Provider, command: Command) -> anyhow::Result<()> {
    let api = provider.api();
    let output = match command {
        Command::Create { kind, config } => {
            let resource = provider.resource(&type_name(&kind))?;
            resource.create(api, load(&config)?).await?
        }
        Command::Read { kind, id, state } => {
            let resource = provider.resource(&type_name(&kind))?;
            let tracked = with_id(state.as_deref().map(load).transpose()?, &id)?;
            resource.read(api, tracked).await?
        }
        Command::Update {
            kind,
            id,
            config,
            state,
        } => {
            let resource = provider.resource(&type_name(&kind))?;
            let tracked = prior(provider, resource, &id, state.as_deref()).await?;
            resource.update(api, tracked, load(&config)?).await?
        }
        Command::Delete { kind, id } => {
            let resource = provider.resource(&type_name(&kind))?;
            resource.delete(api, &parse_id(&id)?).await?;
            json!({ "deleted": id })
        }
        Command::Exists { kind, id } => {
            let resource = provider.resource(&type_name(&kind))?;
            json!({ "exists": resource.exists(api, &parse_id(&id)?).await? })
        }
        Command::Import { kind, id } => {
            let resource = provider.resource(&type_name(&kind))?;
            resource.import(api, &parse_id(&id)?).await?
        }
        Command::Plan {
            kind,
            id,
            config,
            state,
        } => {
            let resource = provider.resource(&type_name(&kind))?;
            let tracked = prior(provider, resource, &id, state.as_deref()).await?;
            serde_json::to_value(resource.plan(tracked, load(&config)?)?)?
        }
        Command::Lookup(lookup) => run_lookup(provider, lookup).await?,
        Command::Schema => serde_json::to_value(provider.schema())?,
    };
    print(&output)
}

async fn run_lookup(provider: &Provider, lookup: Lookup) -> anyhow::Result<Value> {
    let (name, query) = match lookup {
        Lookup::CallerIdentity => ("rancher2_caller_identity", Value::Null),
        Lookup::Project { cluster_id, name } => (
            "rancher2_project",
            serde_json::to_value(ProjectQuery { cluster_id, name })?,
        ),
        Lookup::Token { user_id, expired } => (
            "rancher2_token",
            serde_json::to_value(TokenQuery { user_id, expired })?,
        ),
    };
    Ok(provider
        .data_source(name)?
        .read(provider.api(), query)
        .await?)
}

/// Tracked state to diff against: the supplied document, or a fresh read.
async fn prior(
    provider: &Provider,
    resource: &dyn ManagedResource,
    id: &str,
    state: Option<&str>,
) -> anyhow::Result<Value> {
    if let Some(state) = state {
        return with_id(Some(load(state)?), id);
    }

    tracing::debug!(id, "No tracked state supplied, reading from remote");
    let tracked = resource.read(provider.api(), with_id(None, id)?).await?;
    if tracked.get("id").is_none() {
        bail!("{} with ID \"{id}\" could not be found", resource.type_name());
    }
    Ok(tracked)
}

/// Print a value as pretty JSON on stdout.
pub fn print<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Expand a short kind name (`cluster-registration-token`) to its registry
/// name (`rancher2_cluster_registration_token`).
fn type_name(kind: &str) -> String {
    let kind = kind.replace('-', "_");
    if kind.starts_with(TYPE_PREFIX) {
        kind
    } else {
        format!("{TYPE_PREFIX}{kind}")
    }
}

fn parse_id(id: &str) -> anyhow::Result<ResourceId> {
    ResourceId::new(id).with_context(|| format!("invalid resource ID {id:?}"))
}

/// Parse inline JSON, or the contents of a file when prefixed with `@`.
fn load(document: &str) -> anyhow::Result<Value> {
    match document.strip_prefix('@') {
        Some(path) => {
            let contents = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("failed to read {path}"))?;
            serde_json::from_str(&contents).with_context(|| format!("failed to parse {path}"))
        }
        None => serde_json::from_str(document).context("failed to parse JSON document"),
    }
}

/// Attach the resource identity to a tracked-state document.
fn with_id(state: Option<Value>, id: &str) -> anyhow::Result<Value> {
    let mut state = match state.unwrap_or_else(|| json!({})) {
        Value::Object(fields) => fields,
        other => bail!("tracked state must be a JSON object, got {other}"),
    };
    state.insert("id".to_string(), Value::String(parse_id(id)?.into_inner()));
    Ok(Value::Object(state))
}
