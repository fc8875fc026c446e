use jiff::SpanRelativeTo;
use waymark_directions::{Coordinate, RoutePreference};

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

pub fn parse_coordinate(input: &str) -> Result<Coordinate, String> {
    input.parse::<Coordinate>().map_err(|e| e.to_string())
}

pub fn parse_preference(input: &str) -> Result<RoutePreference, String> {
    input.parse::<RoutePreference>()
}
