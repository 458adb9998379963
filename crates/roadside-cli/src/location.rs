//! Offline map-link commands.

use roadside_location::{decode, encode, is_map_link, Coordinates, MapProvider, Zoom};

/// Print the coordinates, zoom and both share links carried by `link`.
///
/// # Errors
///
/// Returns an error if `link` is not a primary map link with coordinates.
pub(crate) fn run_decode(link: &str) -> anyhow::Result<()> {
    let decoded = decode(link).ok_or_else(|| {
        if is_map_link(link) {
            anyhow::anyhow!("'{link}' is a map link but carries no coordinates; open it and share the pin instead")
        } else {
            anyhow::anyhow!("'{link}' is not a recognised map link")
        }
    })?;

    let coords = decoded.coordinates;
    println!("latitude:  {}", coords.lat());
    println!("longitude: {}", coords.lng());
    println!("zoom:      {}", decoded.zoom);
    println!(
        "primary:   {}",
        encode(coords, decoded.zoom, MapProvider::Primary)
    );
    println!(
        "open map:  {}",
        encode(coords, decoded.zoom, MapProvider::OpenMap)
    );
    Ok(())
}

/// Print the share link for a coordinate pair.
///
/// # Errors
///
/// Returns an error if either coordinate is out of range.
pub(crate) fn run_encode(lat: f64, lng: f64, zoom: i64, provider: MapProvider) -> anyhow::Result<()> {
    let link = encode_link(lat, lng, zoom, provider)?;
    println!("{link}");
    Ok(())
}

fn encode_link(lat: f64, lng: f64, zoom: i64, provider: MapProvider) -> anyhow::Result<String> {
    let coords = Coordinates::new(lat, lng).ok_or_else(|| {
        anyhow::anyhow!("coordinates ({lat}, {lng}) are outside [-90, 90] x [-180, 180]")
    })?;
    Ok(encode(coords, Zoom::new(zoom), provider))
}
