use soap_gateway::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;
    soap_gateway::run(config).await
}
