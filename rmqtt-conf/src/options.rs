use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone, Default)]
pub struct Options {
    /// Config filename
    #[structopt(name = "config", short = "f", long)]
    pub cfg_name: Option<String>,

    /// Node id
    #[structopt(name = "id", long)]
    pub node_id: Option<u64>,

    /// Launched Plug ins
    #[structopt(name = "plugins-default-startups", long)]
    pub plugins_default_startups: Option<Vec<String>>,
}
