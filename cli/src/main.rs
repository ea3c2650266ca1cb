use clap::Parser;
use clap::Subcommand;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Discover { scope } => discover(scope).await?,
        Command::Info {
            address,
            username,
            password,
        } => info(&address, &username, &password).await?,
    };
    Ok(())
}

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lists the addresses of ONVIF cameras on the local subnets.
    Discover {
        /// Subnet prefix to keep, e.g. `192.168`. May be repeated. Defaults
        /// to the prefixes of all local IPv4 interfaces.
        #[arg(long)]
        scope: Vec<String>,
    },

    /// Prints the metadata of one camera.
    Info {
        address: String,

        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },
}

async fn discover(scope: Vec<String>) -> anyhow::Result<()> {
    let scope = if scope.is_empty() { None } else { Some(scope) };
    let addresses = camscout::discover(scope).await?;
    log::info!("{} camera(s) found", addresses.len());
    for address in addresses {
        println!("{}", address);
    }
    Ok(())
}

async fn info(address: &str, username: &str, password: &str) -> anyhow::Result<()> {
    let camera = camscout::Camera::connect(address, username, password).await?;
    println!("Hostname:         {}", camera.hostname().await?);
    println!("Manufacturer:     {}", camera.manufacturer().await?);
    println!("Model:            {}", camera.model().await?);
    println!("Firmware version: {}", camera.firmware_version().await?);
    println!("Serial number:    {}", camera.mac_address().await?);
    println!("Hardware ID:      {}", camera.hardware_id().await?);
    let resolutions: Vec<_> = camera
        .resolutions_available()
        .await?
        .into_iter()
        .map(|(width, height)| format!("{}x{}", width, height))
        .collect();
    println!("Resolutions:      {}", resolutions.join(", "));
    let (min, max) = camera.frame_rate_range().await?;
    println!("Frame rate:       {}-{} fps", min, max);
    println!("Date (UTC):       {}", camera.date().await?);
    println!("Time (UTC):       {}", camera.time().await?);
    println!("PTZ:              {}", if camera.is_ptz().await? { "yes" } else { "no" });
    Ok(())
}
