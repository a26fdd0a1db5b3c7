//! Readers for the tabular inputs. Column names are canonical but column
//! order is not, so everything goes through a header lookup with pointed
//! error messages.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use firesim_structs::units::{parse_bool, parse_number_or_inf, parse_time_minutes};
use firesim_structs::world::{Base, Strike, Target, WaterTank};
use firesim_structs::Location;

pub struct CsvTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn open(path: &Path) -> Result<CsvTable> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("cannot open input file '{}'", path.display()))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader(name: &str, reader: impl Read) -> Result<CsvTable> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr
            .headers()
            .with_context(|| format!("'{}' has no header row", name))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.with_context(|| format!("malformed row in '{}'", name))?;
            rows.push(record.iter().map(|c| c.trim().to_string()).collect());
        }
        Ok(CsvTable { name: name.to_string(), headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .with_context(|| format!("no column labelled '{}' in '{}'", column, self.name))
    }

    /// First column values, used by scenario sweeps to name the scenarios.
    pub fn first_column(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.first().cloned().unwrap_or_default()).collect()
    }

    pub fn cell(&self, column: &str, row: usize) -> Result<&str> {
        let idx = self.column_index(column)?;
        Ok(self.rows[row].get(idx).map(String::as_str).unwrap_or(""))
    }

    pub fn number(&self, column: &str, row: usize) -> Result<f64> {
        let cell = self.cell(column, row)?;
        cell.parse::<f64>().ok().with_context(|| {
            format!("row {} of column '{}' in '{}' ('{}') is not a number", row + 1, column, self.name, cell)
        })
    }

    pub fn number_or_inf(&self, column: &str, row: usize) -> Result<f64> {
        let cell = self.cell(column, row)?;
        parse_number_or_inf(cell).with_context(|| {
            format!("row {} of column '{}' in '{}' ('{}') is not a number", row + 1, column, self.name, cell)
        })
    }

    pub fn boolean(&self, column: &str, row: usize) -> Result<bool> {
        let cell = self.cell(column, row)?;
        parse_bool(cell).with_context(|| {
            format!("row {} of column '{}' in '{}' ('{}') is not a boolean", row + 1, column, self.name, cell)
        })
    }

    pub fn time_minutes(&self, column: &str, row: usize) -> Result<f64> {
        let cell = self.cell(column, row)?;
        parse_time_minutes(cell).with_context(|| {
            format!("row {} of column '{}' in '{}' ('{}') is not a timestamp", row + 1, column, self.name, cell)
        })
    }

    fn location(&self, row: usize) -> Result<Location> {
        Ok(Location::new(self.number("latitude", row)?, self.number("longitude", row)?))
    }
}

pub fn read_locations(path: &Path) -> Result<Vec<Location>> {
    let table = CsvTable::open(path)?;
    (0..table.len()).map(|i| table.location(i)).collect()
}

pub fn read_uav_bases(path: &Path) -> Result<Vec<Base>> {
    let table = CsvTable::open(path)?;
    (0..table.len()).map(|i| Ok(Base { id: i, loc: table.location(i)? })).collect()
}

/// Water-bomber bases: a kind may use a base when column `all` or the kind's
/// own column holds a truthy value.
pub fn read_wb_bases(path: &Path, kinds: &[String]) -> Result<BTreeMap<String, Vec<Base>>> {
    let table = CsvTable::open(path)?;
    let mut by_kind: BTreeMap<String, Vec<Base>> = BTreeMap::new();
    for kind in kinds {
        let mut bases = Vec::new();
        for i in 0..table.len() {
            if table.boolean("all", i)? || table.boolean(kind, i)? {
                bases.push(Base { id: i, loc: table.location(i)? });
            }
        }
        by_kind.insert(kind.clone(), bases);
    }
    Ok(by_kind)
}

pub fn read_water_tanks(path: &Path) -> Result<Vec<WaterTank>> {
    let table = CsvTable::open(path)?;
    (0..table.len())
        .map(|i| {
            let capacity = table.number_or_inf("capacity", i)?;
            if capacity < 0.0 {
                bail!("row {} of '{}': negative tank capacity", i + 1, path.display());
            }
            Ok(WaterTank::new(i, table.location(i)?, capacity))
        })
        .collect()
}

/// Strikes plus the per-row explicit ignition outcome, when the input
/// carries one.
pub fn read_lightning(path: &Path) -> Result<(Vec<Strike>, Vec<Option<bool>>)> {
    let table = CsvTable::open(path)?;
    let has_risk = table.has_column("risk_rating");
    let has_ignited = table.has_column("ignited");
    let has_probability = table.has_column("ignition_probability");
    let mut strikes = Vec::new();
    let mut explicit = Vec::new();
    for i in 0..table.len() {
        let risk_rating = if has_risk {
            let v = table.number("risk_rating", i)?;
            if !(0.0..=1.0).contains(&v) {
                bail!("row {} of '{}': risk_rating {} outside [0, 1]", i + 1, path.display(), v);
            }
            Some(v)
        } else {
            None
        };
        let ignition_probability =
            if has_probability { Some(table.number("ignition_probability", i)?) } else { None };
        strikes.push(Strike {
            id: i,
            loc: table.location(i)?,
            spawn_time: table.time_minutes("time", i)?,
            risk_rating,
            ignition_probability,
            ignited: false,
            inspection_time: None,
            suppression_time: None,
        });
        explicit.push(if has_ignited { Some(table.boolean("ignited", i)?) } else { None });
    }
    // Ids stay input-row ids; the global event queue orders the spawns.
    Ok((strikes, explicit))
}

pub struct SpawnLocation {
    pub loc: Location,
    pub starting_at_base: bool,
    pub initial_fuel: f64,
}

pub fn read_spawn_locations(path: &Path) -> Result<Vec<SpawnLocation>> {
    let table = CsvTable::open(path)?;
    (0..table.len())
        .map(|i| {
            let initial_fuel = table.number("initial fuel", i)?;
            if !(0.0..=1.0).contains(&initial_fuel) {
                bail!("row {} of '{}': initial fuel {} outside [0, 1]", i + 1, path.display(), initial_fuel);
            }
            Ok(SpawnLocation {
                loc: table.location(i)?,
                starting_at_base: table.boolean("starting at base", i)?,
                initial_fuel,
            })
        })
        .collect()
}

pub fn read_targets(path: &Path) -> Result<Vec<Target>> {
    let table = CsvTable::open(path)?;
    (0..table.len())
        .map(|i| {
            let finish = table.cell("finish_time", i)?;
            let finish_time = if finish.eq_ignore_ascii_case("inf") {
                f64::INFINITY
            } else {
                table.time_minutes("finish_time", i)?
            };
            Ok(Target {
                loc: table.location(i)?,
                start_time: table.time_minutes("start_time", i)?,
                finish_time,
            })
        })
        .collect()
}

pub fn read_polygon(path: &Path) -> Result<Vec<Location>> {
    let polygon = read_locations(path)?;
    if polygon.len() < 3 {
        bail!("boundary polygon '{}' has fewer than 3 vertices", path.display());
    }
    Ok(polygon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_order_independent() {
        let data = "longitude,latitude\n145.0,-37.0\n146.0,-36.5\n";
        let table = CsvTable::from_reader("test", data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.number("latitude", 0).unwrap(), -37.0);
        assert_eq!(table.number("longitude", 1).unwrap(), 146.0);
        assert!(table.number("altitude", 0).is_err());
    }

    #[test]
    fn lightning_times_and_ignitions_parse() {
        let data = "latitude,longitude,time,ignited\n\
                    -37.0,145.0,50,1\n\
                    -36.0,146.0,2020/01/01/00/10/00,0\n\
                    -35.0,147.0,30,yes\n";
        let table = CsvTable::from_reader("lightning", data.as_bytes()).unwrap();
        assert_eq!(table.time_minutes("time", 0).unwrap(), 50.0);
        let a = table.time_minutes("time", 1).unwrap();
        let zero = firesim_structs::units::parse_time_minutes("2020/01/01/00/00/00").unwrap();
        assert_eq!(a - zero, 10.0);
        assert!(table.boolean("ignited", 0).unwrap());
        assert!(!table.boolean("ignited", 1).unwrap());
        assert!(table.boolean("ignited", 2).unwrap());
    }

    #[test]
    fn boolean_cells_accept_all_spellings() {
        let data = "latitude,longitude,starting at base,initial fuel\n\
                    -37.0,145.0,YES,1.0\n\
                    -36.0,146.0,0,0.25\n";
        let table = CsvTable::from_reader("spawn", data.as_bytes()).unwrap();
        assert!(table.boolean("starting at base", 0).unwrap());
        assert!(!table.boolean("starting at base", 1).unwrap());
        assert_eq!(table.number("initial fuel", 1).unwrap(), 0.25);
    }
}
