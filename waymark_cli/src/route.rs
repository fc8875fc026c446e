use clap::Args;
use comfy_table::Table;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use waymark_directions::{
    Coordinate, OrsDirectionsClient, ReqwestTransport, RoutePreference,
};
use waymark_session::SessionConfig;

use crate::parsers;

#[derive(Args)]
pub struct RouteArgs {
    /// Start point as "lat,lon"
    #[arg(short, long, value_parser = parsers::parse_coordinate)]
    from: Coordinate,

    /// Destination as "lat,lon"
    #[arg(short, long, value_parser = parsers::parse_coordinate)]
    to: Coordinate,

    /// Routing preference (fastest, shortest, recommended)
    #[arg(short, long, value_parser = parsers::parse_preference)]
    preference: Option<RoutePreference>,

    /// Insert midpoints between consecutive polyline points
    #[arg(long)]
    densify: bool,

    /// HTTP timeout (e.g., "30s", "PT1M")
    #[arg(long, value_parser = parsers::parse_duration, default_value = "30s")]
    timeout: jiff::SignedDuration,

    /// Print every polyline point
    #[arg(long)]
    points: bool,
}

pub async fn run(args: RouteArgs) -> anyhow::Result<()> {
    let mut config = SessionConfig::from_env()?;
    config.directions.preference = args.preference.or(config.directions.preference);
    config.directions.densify |= args.densify;

    let timeout = std::time::Duration::try_from(args.timeout)?;
    let client = OrsDirectionsClient::new(
        config.client_params(),
        ReqwestTransport::with_timeout(timeout)?,
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling request");
            ctrl_c_cancel.cancel();
        }
    });

    info!("Requesting route {} -> {}", args.from, args.to);
    let route = client.fetch_route(args.from, args.to, &cancel).await?;

    let mut table = Table::new();
    table.set_header(vec!["From", "To", "Distance", "Duration", "Points"]);
    table.add_row(vec![
        args.from.to_string(),
        args.to.to_string(),
        route.distance_label(),
        route.duration_label(),
        route.polyline.len().to_string(),
    ]);
    println!("{table}");

    if args.points {
        let mut points = Table::new();
        points.set_header(vec!["#", "Latitude", "Longitude"]);
        for (i, point) in route.polyline.iter().enumerate() {
            points.add_row(vec![
                i.to_string(),
                format!("{:.6}", point.latitude()),
                format!("{:.6}", point.longitude()),
            ]);
        }
        println!("{points}");
    }

    Ok(())
}
