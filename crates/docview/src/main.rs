use clap::Parser;
use docview::{Args, RunCmd};

#[derive(Parser, Debug)]
#[clap(name = "docview", version)]
pub struct Docview {
    #[clap(flatten)]
    pub args: Args,

    #[clap(subcommand)]
    pub cmd: RunCmd,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let docview = Docview::parse();

    docview.cmd.run(docview.args).await
}
