//! Command-line arguments
//!
//! Commands are verb-first (`orch-cli create cluster ...`); each verb holds the
//! nouns it applies to. Noun argument structs live next to their handlers in
//! [`crate::cli::commands`].

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    amtprofile, auth, catalog, cluster, clustertemplate, completion, config, customconfig,
    deployment, host, osprofile, osupdatepolicy, provider, region, site, sshkey, standalone,
    tenancy, wipe,
};
use crate::cli::resource_cmd::{ListArgs, NameArgs, VersionArgs, VersionedArgs};
use crate::core::Feature;

#[derive(Parser, Debug)]
#[command(name = "orch-cli")]
#[command(author, version, about = "Command-line client for the edge orchestrator")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Project to operate in (falls back to the configured project)
    #[arg(long, short = 'p', global = true, env = "ORCH_PROJECT")]
    pub project: Option<String>,

    /// Orchestrator API endpoint, e.g. https://api.orch.example.com
    #[arg(long, global = true, env = "ORCH_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Do not send a bearer token
    #[arg(long, global = true)]
    pub noauth: bool,

    /// Log HTTP request and response headers
    #[arg(long, global = true)]
    pub debug_headers: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to the orchestrator and store the session
    Login(auth::LoginArgs),

    /// End the current session
    Logout,

    /// Create a resource
    #[command(subcommand)]
    Create(CreateCommands),

    /// Show one resource
    #[command(subcommand)]
    Get(GetCommands),

    /// List resources
    #[command(subcommand)]
    List(ListCommands),

    /// Modify a resource
    #[command(subcommand, visible_alias = "update")]
    Set(SetCommands),

    /// Delete a resource
    #[command(subcommand)]
    Delete(DeleteCommands),

    /// Register hosts ahead of onboarding
    #[command(subcommand)]
    Register(RegisterCommands),

    /// Revoke a host's credentials
    #[command(subcommand)]
    Deauthorize(DeauthorizeCommands),

    /// Move a resource to a newer version
    #[command(subcommand)]
    Upgrade(UpgradeCommands),

    /// Import a resource definition from a file
    #[command(subcommand)]
    Import(ImportCommands),

    /// Export a resource definition to a file
    #[command(subcommand)]
    Export(ExportCommands),

    /// Upload artifacts to the catalog
    #[command(subcommand)]
    Upload(UploadCommands),

    /// Generate local provisioning files
    #[command(subcommand)]
    Generate(GenerateCommands),

    /// Delete everything inside a project
    #[command(subcommand)]
    Wipe(WipeCommands),

    /// Inspect or edit the CLI configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Print a shell completion script
    Completion(completion::CompletionArgs),
}

#[derive(Subcommand, Debug)]
pub enum CreateCommands {
    #[command(alias = "org")]
    Organization(tenancy::CreateArgs),
    Project(tenancy::CreateArgs),
    Region(region::CreateArgs),
    Site(site::CreateArgs),
    Osprofile(osprofile::CreateArgs),
    Osupdatepolicy(osupdatepolicy::CreateArgs),
    Customconfig(customconfig::CreateArgs),
    Sshkey(sshkey::CreateArgs),
    Provider(provider::CreateArgs),
    Cluster(cluster::CreateArgs),
    Registry(catalog::RegistryCreateArgs),
    Deployment(deployment::CreateArgs),
    Amtprofile(amtprofile::CreateArgs),
}

#[derive(Subcommand, Debug)]
pub enum GetCommands {
    #[command(alias = "org")]
    Organization(NameArgs),
    Project(NameArgs),
    Region(NameArgs),
    Site(NameArgs),
    Host(NameArgs),
    Osprofile(NameArgs),
    Osupdatepolicy(NameArgs),
    Customconfig(NameArgs),
    Sshkey(NameArgs),
    Provider(NameArgs),
    Cluster(NameArgs),
    Kubeconfig(cluster::KubeconfigArgs),
    Clustertemplate(VersionedArgs),
    Registry(NameArgs),
    Application(VersionedArgs),
    Deploymentpackage(VersionedArgs),
    Deployment(NameArgs),
    Amtprofile(NameArgs),
    /// Show the orchestrator's feature flags
    Features,
}

#[derive(Subcommand, Debug)]
pub enum ListCommands {
    #[command(alias = "org", alias = "organizations")]
    Organization(ListArgs),
    #[command(alias = "projects")]
    Project(ListArgs),
    #[command(alias = "regions")]
    Region(region::ListArgs),
    #[command(alias = "sites")]
    Site(site::ListArgs),
    #[command(alias = "hosts")]
    Host(host::ListArgs),
    #[command(alias = "osprofiles")]
    Osprofile(ListArgs),
    #[command(alias = "osupdatepolicies")]
    Osupdatepolicy(ListArgs),
    #[command(alias = "customconfigs")]
    Customconfig(ListArgs),
    #[command(alias = "sshkeys")]
    Sshkey(ListArgs),
    #[command(alias = "providers")]
    Provider(ListArgs),
    #[command(alias = "clusters")]
    Cluster(ListArgs),
    #[command(alias = "clustertemplates")]
    Clustertemplate(ListArgs),
    #[command(alias = "registries")]
    Registry(ListArgs),
    #[command(alias = "applications")]
    Application(ListArgs),
    #[command(alias = "deploymentpackages")]
    Deploymentpackage(ListArgs),
    #[command(alias = "deployments")]
    Deployment(ListArgs),
    #[command(alias = "amtprofiles")]
    Amtprofile(ListArgs),
}

#[derive(Subcommand, Debug)]
pub enum SetCommands {
    #[command(alias = "org")]
    Organization(tenancy::SetArgs),
    Project(tenancy::SetArgs),
    Region(region::SetArgs),
    Site(site::SetArgs),
    Host(host::SetArgs),
    Cluster(cluster::SetArgs),
    Clustertemplate(clustertemplate::SetArgs),
}

#[derive(Subcommand, Debug)]
pub enum DeleteCommands {
    #[command(alias = "org")]
    Organization(NameArgs),
    Project(NameArgs),
    Region(NameArgs),
    Site(NameArgs),
    Host(NameArgs),
    Osprofile(NameArgs),
    Osupdatepolicy(NameArgs),
    Customconfig(NameArgs),
    Sshkey(NameArgs),
    Provider(NameArgs),
    Cluster(NameArgs),
    Clustertemplate(VersionArgs),
    Registry(NameArgs),
    Application(VersionArgs),
    Deploymentpackage(VersionArgs),
    Deployment(NameArgs),
    Amtprofile(NameArgs),
}

#[derive(Subcommand, Debug)]
pub enum RegisterCommands {
    Host(host::RegisterArgs),
}

#[derive(Subcommand, Debug)]
pub enum DeauthorizeCommands {
    Host(host::DeauthorizeArgs),
}

#[derive(Subcommand, Debug)]
pub enum UpgradeCommands {
    Cluster(cluster::UpgradeArgs),
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    Clustertemplate(clustertemplate::ImportArgs),
}

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    Clustertemplate(clustertemplate::ExportArgs),
}

#[derive(Subcommand, Debug)]
pub enum UploadCommands {
    Deploymentpackage(catalog::UploadArgs),
}

#[derive(Subcommand, Debug)]
pub enum GenerateCommands {
    /// Render a cloud-init document for a standalone edge node
    StandaloneConfig(standalone::GenerateArgs),
}

#[derive(Subcommand, Debug)]
pub enum WipeCommands {
    Project(wipe::WipeArgs),
}

impl Commands {
    /// Orchestrator component a command needs, if any
    ///
    /// Local commands and commands spanning several components return `None`.
    pub fn feature(&self) -> Option<Feature> {
        use Feature::*;
        match self {
            Commands::Create(cmd) => Some(match cmd {
                CreateCommands::Organization(_) | CreateCommands::Project(_) => Multitenancy,
                CreateCommands::Region(_)
                | CreateCommands::Site(_)
                | CreateCommands::Osprofile(_)
                | CreateCommands::Osupdatepolicy(_)
                | CreateCommands::Customconfig(_)
                | CreateCommands::Sshkey(_)
                | CreateCommands::Provider(_) => EdgeInfra,
                CreateCommands::Cluster(_) => ClusterOrch,
                CreateCommands::Registry(_) | CreateCommands::Deployment(_) => AppOrch,
                CreateCommands::Amtprofile(_) => DeviceManagement,
            }),
            Commands::Get(cmd) => match cmd {
                GetCommands::Organization(_) | GetCommands::Project(_) => Some(Multitenancy),
                GetCommands::Region(_)
                | GetCommands::Site(_)
                | GetCommands::Host(_)
                | GetCommands::Osprofile(_)
                | GetCommands::Osupdatepolicy(_)
                | GetCommands::Customconfig(_)
                | GetCommands::Sshkey(_)
                | GetCommands::Provider(_) => Some(EdgeInfra),
                GetCommands::Cluster(_)
                | GetCommands::Kubeconfig(_)
                | GetCommands::Clustertemplate(_) => Some(ClusterOrch),
                GetCommands::Registry(_)
                | GetCommands::Application(_)
                | GetCommands::Deploymentpackage(_)
                | GetCommands::Deployment(_) => Some(AppOrch),
                GetCommands::Amtprofile(_) => Some(DeviceManagement),
                GetCommands::Features => None,
            },
            Commands::List(cmd) => Some(match cmd {
                ListCommands::Organization(_) | ListCommands::Project(_) => Multitenancy,
                ListCommands::Region(_)
                | ListCommands::Site(_)
                | ListCommands::Host(_)
                | ListCommands::Osprofile(_)
                | ListCommands::Osupdatepolicy(_)
                | ListCommands::Customconfig(_)
                | ListCommands::Sshkey(_)
                | ListCommands::Provider(_) => EdgeInfra,
                ListCommands::Cluster(_) | ListCommands::Clustertemplate(_) => ClusterOrch,
                ListCommands::Registry(_)
                | ListCommands::Application(_)
                | ListCommands::Deploymentpackage(_)
                | ListCommands::Deployment(_) => AppOrch,
                ListCommands::Amtprofile(_) => DeviceManagement,
            }),
            Commands::Set(cmd) => Some(match cmd {
                SetCommands::Organization(_) | SetCommands::Project(_) => Multitenancy,
                SetCommands::Region(_) | SetCommands::Site(_) | SetCommands::Host(_) => EdgeInfra,
                SetCommands::Cluster(_) | SetCommands::Clustertemplate(_) => ClusterOrch,
            }),
            Commands::Delete(cmd) => Some(match cmd {
                DeleteCommands::Organization(_) | DeleteCommands::Project(_) => Multitenancy,
                DeleteCommands::Region(_)
                | DeleteCommands::Site(_)
                | DeleteCommands::Host(_)
                | DeleteCommands::Osprofile(_)
                | DeleteCommands::Osupdatepolicy(_)
                | DeleteCommands::Customconfig(_)
                | DeleteCommands::Sshkey(_)
                | DeleteCommands::Provider(_) => EdgeInfra,
                DeleteCommands::Cluster(_) | DeleteCommands::Clustertemplate(_) => ClusterOrch,
                DeleteCommands::Registry(_)
                | DeleteCommands::Application(_)
                | DeleteCommands::Deploymentpackage(_)
                | DeleteCommands::Deployment(_) => AppOrch,
                DeleteCommands::Amtprofile(_) => DeviceManagement,
            }),
            Commands::Register(_) | Commands::Deauthorize(_) => Some(EdgeInfra),
            Commands::Upgrade(_) | Commands::Import(_) | Commands::Export(_) => Some(ClusterOrch),
            Commands::Upload(_) => Some(AppOrch),
            Commands::Login(_)
            | Commands::Logout
            | Commands::Generate(_)
            | Commands::Wipe(_)
            | Commands::Config(_)
            | Commands::Completion(_) => None,
        }
    }
}
