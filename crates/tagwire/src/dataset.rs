use std::fs;
use std::path::Path;

use serde::Deserialize;
use tagwire_proto::{GeoLocation, MeteoriteLanding, MeteoriteLandingList};

use crate::cmd::DatasetArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID};

struct Seed {
    id: u32,
    name: &'static str,
    rec_class: &'static str,
    mass: f64,
    year: i32,
    lat: f64,
    long: f64,
}

const SEEDS: [Seed; 10] = [
    Seed { id: 1, name: "Aachen", rec_class: "L5", mass: 21.0, year: 1880, lat: 50.775, long: 6.08333 },
    Seed { id: 2, name: "Aarhus", rec_class: "H6", mass: 720.0, year: 1951, lat: 56.18333, long: 10.23333 },
    Seed { id: 6, name: "Abee", rec_class: "EH4", mass: 107_000.0, year: 1952, lat: 54.21667, long: -113.0 },
    Seed { id: 10, name: "Acapulco", rec_class: "Acapulcoite", mass: 1914.0, year: 1976, lat: 16.88333, long: -99.9 },
    Seed { id: 370, name: "Achiras", rec_class: "L6", mass: 780.0, year: 1902, lat: -33.16667, long: -64.95 },
    Seed { id: 379, name: "Adhi Kot", rec_class: "EH4", mass: 4239.0, year: 1919, lat: 32.1, long: 71.8 },
    Seed { id: 390, name: "Adzhi-Bogdo (stone)", rec_class: "LL3-6", mass: 910.0, year: 1949, lat: 44.83333, long: 95.16667 },
    Seed { id: 392, name: "Agen", rec_class: "H5", mass: 30_000.0, year: 1814, lat: 44.21667, long: 0.61667 },
    Seed { id: 398, name: "Aguada", rec_class: "L6", mass: 1620.0, year: 1930, lat: -31.6, long: -65.23333 },
    Seed { id: 417, name: "Aguila Blanca", rec_class: "L", mass: 1440.0, year: 1920, lat: -30.86667, long: -64.55 },
];

/// Deterministic synthetic records: the seed table repeated, with each
/// repetition getting distinct ids and name suffixes.
pub fn sample(n: usize) -> Vec<MeteoriteLanding> {
    (0..n)
        .map(|index| {
            let seed = &SEEDS[index % SEEDS.len()];
            let cycle = (index / SEEDS.len()) as u32;
            let name = if cycle == 0 {
                seed.name.to_string()
            } else {
                format!("{} {cycle}", seed.name)
            };
            MeteoriteLanding {
                id: seed.id + cycle * 1_000,
                name,
                name_type: "Valid".to_string(),
                rec_class: seed.rec_class.to_string(),
                mass: seed.mass + f64::from(cycle),
                fall: "Fell".to_string(),
                year: seed.year,
                rec_lat: seed.lat,
                rec_long: seed.long,
                geo_location: Some(GeoLocation {
                    kind: "Point".to_string(),
                    coordinates: vec![seed.long, seed.lat],
                }),
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DatasetFile {
    List(Vec<MeteoriteLanding>),
    Wrapped(MeteoriteLandingList),
}

/// Load records from a JSON file.
pub fn load_json(path: &Path) -> CliResult<Vec<MeteoriteLanding>> {
    let raw = fs::read(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    let parsed: DatasetFile = serde_json::from_slice(&raw).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("{} is not a record dataset: {err}", path.display()),
        )
    })?;
    Ok(match parsed {
        DatasetFile::List(records) => records,
        DatasetFile::Wrapped(list) => list.meteorite_landings,
    })
}

/// Resolve dataset arguments to records.
pub fn resolve(args: &DatasetArgs) -> CliResult<Vec<MeteoriteLanding>> {
    match &args.dataset {
        Some(path) => load_json(path),
        None => Ok(sample(args.records)),
    }
}
