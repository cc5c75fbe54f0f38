use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use carina_core::differ::{Diff, diff};
use carina_core::provider::{Provider, ResourceType};
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use carina_provider_oci::resources::deployment_versions::DATA_SOURCE_TYPE;
use carina_provider_oci::resources::{resource_types, schema_for};
use carina_provider_oci::{OciConfig, OciProvider};

mod state;

use state::{StateStore, load_resource, value_to_json};

#[derive(Parser)]
#[command(name = "carina-oci")]
#[command(about = "Manage OCI GoldenGate deployments", long_about = None)]
struct Cli {
    /// Provider configuration file (TOML); OCI_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State file
    #[arg(long, global = true, default_value = ".carina/state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the attributes of a resource type, or list the types
    Schema { resource_type: Option<String> },
    /// Validate a resource file
    Validate { file: PathBuf },
    /// Show what apply would change
    Plan { file: PathBuf },
    /// Create the resource in a resource file
    Create { file: PathBuf },
    /// Refresh the stored state of a resource
    Read { file: PathBuf },
    /// Adopt an existing deployment into the state file
    Import { file: PathBuf, identifier: String },
    /// Update (or replace) a resource to match its resource file
    Update { file: PathBuf },
    /// Delete a resource
    Delete {
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// List the OGG versions available to deployments
    Versions {
        #[arg(long)]
        compartment_id: String,

        #[arg(long)]
        deployment_id: Option<String>,

        #[arg(long)]
        deployment_type: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Validate { file } => run_validate(file),
        Commands::Plan { file } => run_plan(&cli, file).await,
        Commands::Create { file } => run_create(&cli, file).await,
        Commands::Read { file } => run_read(&cli, file).await,
        Commands::Import { file, identifier } => run_import(&cli, file, identifier).await,
        Commands::Update { file } => run_update(&cli, file).await,
        Commands::Delete { file, auto_approve } => run_delete(&cli, file, *auto_approve).await,
        Commands::Versions {
            compartment_id,
            deployment_id,
            deployment_type,
        } => {
            run_versions(
                &cli,
                compartment_id,
                deployment_id.as_deref(),
                deployment_type.as_deref(),
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<OciConfig, String> {
    let config = match path {
        Some(path) => OciConfig::load(path).map_err(|e| e.to_string())?,
        None => OciConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn get_provider(cli: &Cli) -> Result<OciProvider, String> {
    let config = load_config(cli.config.as_deref())?;
    log::debug!(
        "region {:?}, endpoint {:?}",
        config.region.as_deref(),
        config.endpoint.as_deref()
    );
    OciProvider::from_config(&config).map_err(|e| format!("Failed to create provider: {}", e))
}

fn get_schema(resource_type: &str) -> Result<ResourceSchema, String> {
    schema_for(resource_type).ok_or_else(|| format!("Unknown resource type: {}", resource_type))
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let Some(resource_type) = resource_type else {
        let mut names: Vec<String> = resource_types()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    };

    let schema = get_schema(resource_type)?;
    println!("{}", schema.resource_type.cyan().bold());
    if let Some(description) = &schema.description {
        println!("  {}", description);
    }
    println!();
    print_attributes(&schema.attributes.values().collect::<Vec<_>>(), 1);

    if resource_type != DATA_SOURCE_TYPE {
        let t = schema.timeouts;
        println!();
        println!(
            "  timeouts: create {}m, update {}m, delete {}m",
            t.create.as_secs() / 60,
            t.update.as_secs() / 60,
            t.delete.as_secs() / 60
        );
    }
    Ok(())
}

fn print_attributes(attributes: &[&AttributeSchema], depth: usize) {
    let mut attributes = attributes.to_vec();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    let indent = "  ".repeat(depth);

    for attr in attributes {
        let mode = if attr.required {
            "required".yellow()
        } else if attr.is_computed_only() {
            "computed".dimmed()
        } else {
            "optional".normal()
        };
        let mut flags = Vec::new();
        if attr.force_new {
            flags.push("forces replacement");
        }
        if attr.sensitive {
            flags.push("sensitive");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!(
            "{}{}: {} [{}]{}",
            indent,
            attr.name.bold(),
            attr.attr_type,
            mode,
            flags
        );

        if let Some(nested) = nested_attributes(&attr.attr_type) {
            print_attributes(&nested.iter().collect::<Vec<_>>(), depth + 1);
        }
    }
}

fn nested_attributes(attr_type: &AttributeType) -> Option<&[AttributeSchema]> {
    match attr_type {
        AttributeType::Block(nested) => Some(nested),
        AttributeType::List(inner) => nested_attributes(inner),
        _ => None,
    }
}

fn run_validate(file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    OciProvider::validate(&resource).map_err(|e| e.to_string())?;
    println!(
        "{} {}.{} is valid",
        "✓".green().bold(),
        resource.id.resource_type,
        resource.id.name
    );
    Ok(())
}

/// Read the live state of `resource`, keeping write-only values that only the
/// stored state knows
async fn refresh(
    provider: &OciProvider,
    store: &StateStore,
    resource: &Resource,
) -> Result<State, String> {
    let stored = store.get(&resource.id);
    let identifier = stored.as_ref().and_then(|s| s.identifier.as_deref());
    let mut current = provider
        .read(&resource.id, identifier)
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;

    if let Some(stored) = stored
        && current.exists
    {
        carry_write_only(&mut current.attributes, &stored.attributes);
    }
    Ok(current)
}

/// Copy values missing from freshly read blocks over from the stored blocks
fn carry_write_only(current: &mut HashMap<String, Value>, stored: &HashMap<String, Value>) {
    for (key, value) in current.iter_mut() {
        if let (Value::List(blocks), Some(Value::List(old_blocks))) = (value, stored.get(key)) {
            for (block, old) in blocks.iter_mut().zip(old_blocks) {
                if let (Value::Map(block), Value::Map(old)) = (block, old) {
                    for (k, v) in old {
                        block.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
            }
        }
    }
}

async fn run_plan(cli: &Cli, file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    let schema = get_schema(&resource.id.resource_type)?;
    OciProvider::validate(&resource).map_err(|e| e.to_string())?;

    let provider = get_provider(cli)?;
    let store = StateStore::open(&cli.state)?;
    let current = refresh(&provider, &store, &resource).await?;

    print_diff(&diff(&resource, &current, Some(&schema)), &schema);
    Ok(())
}

fn print_diff(diff: &Diff, schema: &ResourceSchema) {
    match diff {
        Diff::NoChange(_) => {
            println!("{}", "No changes. Infrastructure is up-to-date.".green());
        }
        Diff::Create(resource) => {
            println!("{} {}", "+".green().bold(), format_id(&resource.id));
            let mut keys: Vec<_> = resource.attributes.keys().collect();
            keys.sort();
            for key in keys {
                println!(
                    "    {}: {}",
                    key,
                    display_value(schema, key, &resource.attributes[key])
                );
            }
        }
        Diff::Update {
            id,
            from,
            to,
            changed_attributes,
        } => {
            println!("{} {}", "~".yellow().bold(), format_id(id));
            print_changes(schema, from, to, changed_attributes);
        }
        Diff::Replace {
            id,
            from,
            to,
            changed_attributes,
        } => {
            println!(
                "{} {} {}",
                "-/+".magenta().bold(),
                format_id(id),
                "(must be replaced)".magenta()
            );
            print_changes(schema, from, to, changed_attributes);
        }
    }
}

fn print_changes(schema: &ResourceSchema, from: &State, to: &Resource, changed: &[String]) {
    for key in changed {
        let old = from
            .attributes
            .get(key)
            .map(|v| display_value(schema, key, v))
            .unwrap_or_else(|| "(none)".to_string());
        let new = to
            .attributes
            .get(key)
            .map(|v| display_value(schema, key, v))
            .unwrap_or_else(|| "(none)".to_string());
        println!("    {}: {} → {}", key, old.red(), new.green());
    }
}

fn format_id(id: &ResourceId) -> String {
    format!("{}.{}", id.resource_type, id.name).bold().to_string()
}

/// Format a value for display, hiding sensitive attributes
fn display_value(schema: &ResourceSchema, key: &str, value: &Value) -> String {
    match schema.attributes.get(key) {
        Some(attr) if attr.sensitive => "(sensitive)".to_string(),
        Some(attr) => match nested_attributes(&attr.attr_type) {
            Some(nested) => format_value(&redact(value, nested)),
            None => format_value(value),
        },
        None => format_value(value),
    }
}

fn redact(value: &Value, nested: &[AttributeSchema]) -> Value {
    match value {
        Value::List(items) => Value::List(items.iter().map(|v| redact(v, nested)).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| {
                    let hidden = nested.iter().any(|a| &a.name == k && a.sensitive);
                    let v = if hidden {
                        Value::String("(sensitive)".to_string())
                    } else {
                        v.clone()
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut strs: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            strs.sort();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

fn print_state(state: &State) -> Result<(), String> {
    let schema = get_schema(&state.id.resource_type)?;
    let attributes: serde_json::Map<_, _> = state
        .attributes
        .iter()
        .map(|(k, v)| {
            let shown = match schema.attributes.get(k) {
                Some(attr) if attr.sensitive => Value::String("(sensitive)".to_string()),
                Some(attr) => match nested_attributes(&attr.attr_type) {
                    Some(nested) => redact(v, nested),
                    None => v.clone(),
                },
                None => v.clone(),
            };
            (k.clone(), value_to_json(&shown))
        })
        .collect();
    let output = serde_json::json!({
        "type": state.id.resource_type,
        "name": state.id.name,
        "identifier": state.identifier,
        "attributes": attributes,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?
    );
    Ok(())
}

async fn run_create(cli: &Cli, file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    let provider = get_provider(cli)?;
    let mut store = StateStore::open(&cli.state)?;

    if let Some(identifier) = store.identifier(&resource.id) {
        return Err(format!(
            "{}.{} already exists as {}",
            resource.id.resource_type, resource.id.name, identifier
        ));
    }

    println!("{} {}", "Creating".green().bold(), format_id(&resource.id));
    let state = provider
        .create(&resource)
        .await
        .map_err(|e| e.to_string())?;
    store.put(&state);
    store.save()?;

    println!("{} {}", "✓".green().bold(), format_id(&resource.id));
    print_state(&state)
}

async fn run_read(cli: &Cli, file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    let provider = get_provider(cli)?;
    let mut store = StateStore::open(&cli.state)?;

    let state = refresh(&provider, &store, &resource).await?;
    if !state.exists {
        store.remove(&resource.id);
        store.save()?;
        println!(
            "{} {} does not exist",
            "!".yellow().bold(),
            format_id(&resource.id)
        );
        return Ok(());
    }

    store.put(&state);
    store.save()?;
    print_state(&state)
}

async fn run_import(cli: &Cli, file: &Path, identifier: &str) -> Result<(), String> {
    let resource = load_resource(file)?;
    get_schema(&resource.id.resource_type)?;
    let provider = get_provider(cli)?;
    let mut store = StateStore::open(&cli.state)?;
    if let Some(existing) = store.identifier(&resource.id) {
        return Err(format!(
            "{} is already tracked as {}",
            format_id(&resource.id),
            existing
        ));
    }

    println!("{} {}", "Importing".green().bold(), identifier);
    let state = provider
        .read(&resource.id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;
    let state = adopt(&mut store, identifier, state)?;
    store.save()?;

    println!("{} {}", "✓".green().bold(), format_id(&resource.id));
    print_state(&state)
}

/// Record a state read by identifier; a deployment the service does not
/// know cannot be imported.
fn adopt(store: &mut StateStore, identifier: &str, state: State) -> Result<State, String> {
    if !state.exists {
        return Err(format!("{} not found", identifier));
    }
    let state = if state.identifier.is_some() {
        state
    } else {
        state.with_identifier(identifier)
    };
    store.put(&state);
    Ok(state)
}

async fn run_update(cli: &Cli, file: &Path) -> Result<(), String> {
    let resource = load_resource(file)?;
    let schema = get_schema(&resource.id.resource_type)?;
    let provider = get_provider(cli)?;
    let mut store = StateStore::open(&cli.state)?;

    let current = refresh(&provider, &store, &resource).await?;
    let plan = diff(&resource, &current, Some(&schema));
    print_diff(&plan, &schema);

    let state = match plan {
        Diff::NoChange(_) => return Ok(()),
        Diff::Create(resource) => provider.create(&resource).await,
        Diff::Update { id, from, to, .. } => {
            let identifier = from
                .identifier
                .clone()
                .ok_or_else(|| format!("{}.{} has no identifier", id.resource_type, id.name))?;
            provider.update(&id, &identifier, &from, &to).await
        }
        Diff::Replace { id, from, to, .. } => {
            if let Some(identifier) = &from.identifier {
                provider
                    .delete(&id, identifier)
                    .await
                    .map_err(|e| e.to_string())?;
                store.remove(&id);
                store.save()?;
            }
            provider.create(&to).await
        }
    }
    .map_err(|e| e.to_string())?;

    store.put(&state);
    store.save()?;
    println!("{} {}", "✓".green().bold(), format_id(&state.id));
    print_state(&state)
}

async fn run_delete(cli: &Cli, file: &Path, auto_approve: bool) -> Result<(), String> {
    let resource = load_resource(file)?;
    let mut store = StateStore::open(&cli.state)?;

    let Some(identifier) = store.identifier(&resource.id) else {
        println!(
            "{}",
            format!(
                "{}.{} is not in the state file.",
                resource.id.resource_type, resource.id.name
            )
            .yellow()
        );
        return Ok(());
    };

    if !auto_approve {
        println!(
            "{}",
            format!("Do you really want to delete {}?", identifier)
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let provider = get_provider(cli)?;
    println!("{} {}", "Deleting".red().bold(), format_id(&resource.id));
    provider
        .delete(&resource.id, &identifier)
        .await
        .map_err(|e| e.to_string())?;

    store.remove(&resource.id);
    store.save()?;
    println!("{} {}", "✓".green().bold(), format_id(&resource.id));
    Ok(())
}

async fn run_versions(
    cli: &Cli,
    compartment_id: &str,
    deployment_id: Option<&str>,
    deployment_type: Option<&str>,
) -> Result<(), String> {
    let mut query = Resource::new(DATA_SOURCE_TYPE, "versions")
        .with_read_only(true)
        .with_attribute("compartment_id", Value::String(compartment_id.to_string()));
    if let Some(id) = deployment_id {
        query = query.with_attribute("deployment_id", Value::String(id.to_string()));
    }
    if let Some(t) = deployment_type {
        query = query.with_attribute("deployment_type", Value::String(t.to_string()));
    }

    let provider = get_provider(cli)?;
    let state = provider
        .read_data_source(&query)
        .await
        .map_err(|e| e.to_string())?;

    let items = state
        .get("deployment_version_collection.0.items")
        .and_then(Value::as_list)
        .unwrap_or_default();
    if items.is_empty() {
        println!("{}", "No versions found.".yellow());
        return Ok(());
    }

    for item in items {
        let field = |name: &str| item.get_path(name).and_then(Value::as_str).unwrap_or("-");
        let security = match item.get_path("is_security_fix").and_then(Value::as_bool) {
            Some(true) => " (security fix)".red().to_string(),
            _ => String::new(),
        };
        println!(
            "{}  {}  {}  released {}{}",
            field("ogg_version").bold(),
            field("deployment_type"),
            field("release_type"),
            field("time_released"),
            security
        );
    }
    Ok(())
}
