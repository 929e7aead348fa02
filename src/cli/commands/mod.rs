//! CLI command implementations
//!
//! Handlers take parsed arguments, a [`Context`] and an output sink so they can
//! be driven by tests with a mock transport. [`run`] wires them to the real
//! configuration, the HTTP transport and stdout.

pub mod amtprofile;
pub mod auth;
pub mod catalog;
pub mod cluster;
pub mod clustertemplate;
pub mod completion;
pub mod config;
pub mod customconfig;
pub mod deployment;
pub mod host;
pub mod osprofile;
pub mod osupdatepolicy;
pub mod provider;
pub mod region;
pub mod site;
pub mod sshkey;
pub mod standalone;
pub mod tenancy;
pub mod wipe;

use miette::Result;
use std::io::{self, Write};

use crate::cli::args::{
    Commands, CreateCommands, DeauthorizeCommands, DeleteCommands, ExportCommands,
    GenerateCommands, GetCommands, ImportCommands, ListCommands, RegisterCommands, SetCommands,
    UpgradeCommands, UploadCommands, WipeCommands,
};
use crate::cli::context::{Context, ContextError};
use crate::cli::resource_cmd::{run_delete_generic, run_get_generic, run_list_generic};
use crate::cli::{Cli, GlobalOpts};
use crate::core::{Config, Feature};

use catalog::{APPLICATIONS, DEPLOYMENT_PACKAGES, REGISTRIES};
use tenancy::{ORGANIZATIONS, PROJECTS};

/// Execute a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let Cli {
        mut global,
        command,
    } = cli;
    let feature = command.feature();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Config(cmd) => config::run(cmd, global.output, &mut out),
        Commands::Completion(args) => completion::run(args, &mut out),
        Commands::Generate(GenerateCommands::StandaloneConfig(args)) => {
            standalone::run(args, &mut out)
        }
        Commands::Login(args) => {
            let mut config = Config::load()?;
            auth::login(args, &global, &mut config, &mut out)
        }
        Commands::Logout => {
            let mut config = Config::load()?;
            auth::logout(&global, &mut config, &mut out)
        }
        Commands::Wipe(WipeCommands::Project(args)) => {
            // The project being wiped is the project every request targets
            global.project = Some(args.name.clone());
            let ctx = api_context(&global, feature)?;
            wipe::run(args, &ctx, &mut out)
        }
        Commands::Create(cmd) => create(cmd, &api_context(&global, feature)?, &mut out),
        Commands::Get(cmd) => get(cmd, &api_context(&global, feature)?, &mut out),
        Commands::List(cmd) => list(cmd, &api_context(&global, feature)?, &mut out),
        Commands::Set(cmd) => set(cmd, &api_context(&global, feature)?, &mut out),
        Commands::Delete(cmd) => delete(cmd, &api_context(&global, feature)?, &mut out),
        Commands::Register(RegisterCommands::Host(args)) => {
            host::register(args, &api_context(&global, feature)?, &mut out)
        }
        Commands::Deauthorize(DeauthorizeCommands::Host(args)) => {
            host::deauthorize(args, &api_context(&global, feature)?, &mut out)
        }
        Commands::Upgrade(UpgradeCommands::Cluster(args)) => {
            cluster::upgrade(args, &api_context(&global, feature)?, &mut out)
        }
        Commands::Import(ImportCommands::Clustertemplate(args)) => {
            clustertemplate::import(args, &api_context(&global, feature)?, &mut out)
        }
        Commands::Export(ExportCommands::Clustertemplate(args)) => {
            clustertemplate::export(args, &api_context(&global, feature)?, &mut out)
        }
        Commands::Upload(UploadCommands::Deploymentpackage(args)) => {
            catalog::upload(args, &api_context(&global, feature)?, &mut out)
        }
    }
}

/// Refuse commands whose orchestrator component is switched off
pub fn ensure_enabled(config: &Config, feature: Option<Feature>) -> Result<(), ContextError> {
    match feature {
        Some(feature) if !config.feature_enabled(feature) => {
            Err(ContextError::FeatureDisabled(feature))
        }
        _ => Ok(()),
    }
}

fn api_context(global: &GlobalOpts, feature: Option<Feature>) -> Result<Context> {
    let config = Config::load()?;
    ensure_enabled(&config, feature)?;
    tracing::debug!(config = %config.path().display(), "building API context");
    Context::from_global(global, config)
}

fn create(cmd: CreateCommands, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match cmd {
        CreateCommands::Organization(args) => tenancy::create(&ORGANIZATIONS, args, ctx, out),
        CreateCommands::Project(args) => tenancy::create(&PROJECTS, args, ctx, out),
        CreateCommands::Region(args) => region::create(args, ctx, out),
        CreateCommands::Site(args) => site::create(args, ctx, out),
        CreateCommands::Osprofile(args) => osprofile::create(args, ctx, out),
        CreateCommands::Osupdatepolicy(args) => osupdatepolicy::create(args, ctx, out),
        CreateCommands::Customconfig(args) => customconfig::create(args, ctx, out),
        CreateCommands::Sshkey(args) => sshkey::create(args, ctx, out),
        CreateCommands::Provider(args) => provider::create(args, ctx, out),
        CreateCommands::Cluster(args) => cluster::create(args, ctx, out),
        CreateCommands::Registry(args) => catalog::create_registry(args, ctx, out),
        CreateCommands::Deployment(args) => deployment::create(args, ctx, out),
        CreateCommands::Amtprofile(args) => amtprofile::create(args, ctx, out),
    }
}

fn get(cmd: GetCommands, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match cmd {
        GetCommands::Organization(args) => tenancy::get(&ORGANIZATIONS, &args.name, ctx, out),
        GetCommands::Project(args) => tenancy::get(&PROJECTS, &args.name, ctx, out),
        GetCommands::Region(args) => run_get_generic(&region::REGIONS, &args.name, ctx, out),
        GetCommands::Site(args) => run_get_generic(&site::SITES, &args.name, ctx, out),
        GetCommands::Host(args) => run_get_generic(&host::HOSTS, &args.name, ctx, out),
        GetCommands::Osprofile(args) => {
            run_get_generic(&osprofile::OS_PROFILES, &args.name, ctx, out)
        }
        GetCommands::Osupdatepolicy(args) => {
            run_get_generic(&osupdatepolicy::OS_UPDATE_POLICIES, &args.name, ctx, out)
        }
        GetCommands::Customconfig(args) => {
            run_get_generic(&customconfig::CUSTOM_CONFIGS, &args.name, ctx, out)
        }
        GetCommands::Sshkey(args) => run_get_generic(&sshkey::SSH_KEYS, &args.name, ctx, out),
        GetCommands::Provider(args) => run_get_generic(&provider::PROVIDERS, &args.name, ctx, out),
        GetCommands::Cluster(args) => run_get_generic(&cluster::CLUSTERS, &args.name, ctx, out),
        GetCommands::Kubeconfig(args) => cluster::kubeconfig(args, ctx, out),
        GetCommands::Clustertemplate(args) => {
            clustertemplate::get(&args.name, args.version.as_deref(), ctx, out)
        }
        GetCommands::Registry(args) => catalog::get_registry(&args.name, ctx, out),
        GetCommands::Application(args) => {
            catalog::get_versioned(&APPLICATIONS, &args.name, args.version.as_deref(), ctx, out)
        }
        GetCommands::Deploymentpackage(args) => catalog::get_versioned(
            &DEPLOYMENT_PACKAGES,
            &args.name,
            args.version.as_deref(),
            ctx,
            out,
        ),
        GetCommands::Deployment(args) => {
            run_get_generic(&deployment::DEPLOYMENTS, &args.name, ctx, out)
        }
        GetCommands::Amtprofile(args) => {
            run_get_generic(&amtprofile::AMT_PROFILES, &args.name, ctx, out)
        }
        GetCommands::Features => auth::features(ctx, out),
    }
}

fn list(cmd: ListCommands, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match cmd {
        ListCommands::Organization(args) => tenancy::list(&ORGANIZATIONS, &args, ctx, out),
        ListCommands::Project(args) => tenancy::list(&PROJECTS, &args, ctx, out),
        ListCommands::Region(args) => region::list(args, ctx, out),
        ListCommands::Site(args) => site::list(args, ctx, out),
        ListCommands::Host(args) => host::list(args, ctx, out),
        ListCommands::Osprofile(args) => {
            run_list_generic(&osprofile::OS_PROFILES, &args, &[], ctx, out)
        }
        ListCommands::Osupdatepolicy(args) => {
            run_list_generic(&osupdatepolicy::OS_UPDATE_POLICIES, &args, &[], ctx, out)
        }
        ListCommands::Customconfig(args) => {
            run_list_generic(&customconfig::CUSTOM_CONFIGS, &args, &[], ctx, out)
        }
        ListCommands::Sshkey(args) => run_list_generic(&sshkey::SSH_KEYS, &args, &[], ctx, out),
        ListCommands::Provider(args) => {
            run_list_generic(&provider::PROVIDERS, &args, &[], ctx, out)
        }
        ListCommands::Cluster(args) => run_list_generic(&cluster::CLUSTERS, &args, &[], ctx, out),
        ListCommands::Clustertemplate(args) => clustertemplate::list(&args, ctx, out),
        ListCommands::Registry(args) => run_list_generic(&REGISTRIES, &args, &[], ctx, out),
        ListCommands::Application(args) => run_list_generic(&APPLICATIONS, &args, &[], ctx, out),
        ListCommands::Deploymentpackage(args) => {
            run_list_generic(&DEPLOYMENT_PACKAGES, &args, &[], ctx, out)
        }
        ListCommands::Deployment(args) => {
            run_list_generic(&deployment::DEPLOYMENTS, &args, &[], ctx, out)
        }
        ListCommands::Amtprofile(args) => {
            run_list_generic(&amtprofile::AMT_PROFILES, &args, &[], ctx, out)
        }
    }
}

fn set(cmd: SetCommands, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match cmd {
        SetCommands::Organization(args) => tenancy::set(&ORGANIZATIONS, args, ctx, out),
        SetCommands::Project(args) => tenancy::set(&PROJECTS, args, ctx, out),
        SetCommands::Region(args) => region::set(args, ctx, out),
        SetCommands::Site(args) => site::set(args, ctx, out),
        SetCommands::Host(args) => host::set(args, ctx, out),
        SetCommands::Cluster(args) => cluster::set(args, ctx, out),
        SetCommands::Clustertemplate(args) => clustertemplate::set(args, ctx, out),
    }
}

fn delete(cmd: DeleteCommands, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match cmd {
        DeleteCommands::Organization(args) => tenancy::delete(&ORGANIZATIONS, &args.name, ctx, out),
        DeleteCommands::Project(args) => tenancy::delete(&PROJECTS, &args.name, ctx, out),
        DeleteCommands::Region(args) => run_delete_generic(&region::REGIONS, &args.name, ctx, out),
        DeleteCommands::Site(args) => run_delete_generic(&site::SITES, &args.name, ctx, out),
        DeleteCommands::Host(args) => run_delete_generic(&host::HOSTS, &args.name, ctx, out),
        DeleteCommands::Osprofile(args) => {
            run_delete_generic(&osprofile::OS_PROFILES, &args.name, ctx, out)
        }
        DeleteCommands::Osupdatepolicy(args) => {
            run_delete_generic(&osupdatepolicy::OS_UPDATE_POLICIES, &args.name, ctx, out)
        }
        DeleteCommands::Customconfig(args) => {
            run_delete_generic(&customconfig::CUSTOM_CONFIGS, &args.name, ctx, out)
        }
        DeleteCommands::Sshkey(args) => run_delete_generic(&sshkey::SSH_KEYS, &args.name, ctx, out),
        DeleteCommands::Provider(args) => {
            run_delete_generic(&provider::PROVIDERS, &args.name, ctx, out)
        }
        DeleteCommands::Cluster(args) => run_delete_generic(&cluster::CLUSTERS, &args.name, ctx, out),
        DeleteCommands::Clustertemplate(args) => {
            clustertemplate::delete(&args.name, &args.version, ctx, out)
        }
        DeleteCommands::Registry(args) => run_delete_generic(&REGISTRIES, &args.name, ctx, out),
        DeleteCommands::Application(args) => {
            catalog::delete_versioned(&APPLICATIONS, &args.name, &args.version, ctx, out)
        }
        DeleteCommands::Deploymentpackage(args) => {
            catalog::delete_versioned(&DEPLOYMENT_PACKAGES, &args.name, &args.version, ctx, out)
        }
        DeleteCommands::Deployment(args) => {
            run_delete_generic(&deployment::DEPLOYMENTS, &args.name, ctx, out)
        }
        DeleteCommands::Amtprofile(args) => {
            run_delete_generic(&amtprofile::AMT_PROFILES, &args.name, ctx, out)
        }
    }
}
