use anyhow::Result;
use pagedrift::{config::Config, drift::RobotsGate};
use url::Url;

pub async fn robots_check(config: Config, url: String, user_agent: Option<String>) -> Result<()> {
    let parsed = Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid URL '{}': {}", url, e))?;
    let gate = RobotsGate::new(&config.robots, &config.fetch)?;
    let user_agent = user_agent.unwrap_or_else(|| config.fetch.user_agent.clone());

    if gate.is_allowed(&parsed, &user_agent).await {
        println!("Fetching is allowed for {}", url);
    } else {
        println!("Fetching is NOT allowed for {}", url);
    }
    Ok(())
}
