//! Command implementations

use std::path::Path;

use chrono::Utc;
use clap::Args;

use twin_control::inspect;
use twin_control::{
    scaffold, ContextSnapshot, RecommendationBatch, Result, StateUpdate, Twin, TwinConfig, ZoneId,
    ZoneStatus,
};
use twin_scene::EditLog;

/// Values for `set`; omitted flags leave the store alone
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Air temperature in degrees C
    #[arg(long)]
    temperature: Option<f64>,
    /// Relative humidity in percent
    #[arg(long)]
    humidity: Option<f64>,
    /// Greenhouse-wide soil moisture in percent
    #[arg(long)]
    soil_moisture: Option<f64>,
    /// Fan power, 0 to 1
    #[arg(long)]
    fan: Option<f64>,
    /// Vent position
    #[arg(long)]
    vent: Option<f64>,
    /// Valve flow, 0 to 1
    #[arg(long)]
    valve: Option<f64>,
    #[arg(long)]
    fan_enabled: Option<bool>,
    #[arg(long)]
    vent_enabled: Option<bool>,
    #[arg(long)]
    valve_enabled: Option<bool>,
    /// Increment state:tick
    #[arg(long)]
    tick: bool,
    /// Value for state:lastUpdated
    #[arg(long)]
    last_updated: Option<String>,
    /// Zone the zone flags apply to, e.g. B03-C
    #[arg(long)]
    zone: Option<String>,
    #[arg(long)]
    zone_moisture: Option<f64>,
    #[arg(long)]
    zone_light: Option<f64>,
    #[arg(long)]
    zone_health: Option<f64>,
    /// ok, dry, wet, shaded or stressed
    #[arg(long)]
    zone_status: Option<String>,
}

impl SetArgs {
    fn to_update(&self) -> Result<StateUpdate> {
        let zone_status = self
            .zone_status
            .as_deref()
            .map(str::parse::<ZoneStatus>)
            .transpose()?;
        Ok(StateUpdate {
            temperature_c: self.temperature,
            humidity_pct: self.humidity,
            soil_moisture_pct: self.soil_moisture,
            fan_power: self.fan,
            vent_position: self.vent,
            valve_flow: self.valve,
            fan_enabled: self.fan_enabled,
            vent_enabled: self.vent_enabled,
            valve_enabled: self.valve_enabled,
            tick: self.tick,
            last_updated: self.last_updated.clone(),
            zone: self.zone.clone(),
            zone_moisture_pct: self.zone_moisture,
            zone_light_pct: self.zone_light,
            zone_health_score: self.zone_health,
            zone_status,
        })
    }
}

fn finish(twin: &mut Twin, edits: &EditLog) -> Result<()> {
    for edit in edits.iter() {
        log::debug!("{}", edit);
    }
    if twin.save()? {
        println!("Saved {} edit(s) to {}", edits.len(), twin.live_layer());
    } else {
        println!("No changes.");
    }
    Ok(())
}

pub fn init(config: &TwinConfig, force: bool) -> Result<()> {
    scaffold(&config.store.root, config, force)?;
    println!(
        "Created greenhouse store at {} ({} bed(s))",
        config.store.root.display(),
        config.zones.bed_count
    );
    Ok(())
}

pub fn inspect(config: TwinConfig, depth: Option<usize>) -> Result<()> {
    let twin = Twin::open(config)?;
    print!("{}", inspect::render_report(&twin.view(), depth)?);
    Ok(())
}

pub fn set(config: TwinConfig, args: &SetArgs) -> Result<()> {
    let update = args.to_update()?;
    if update.is_empty() {
        println!("Nothing to set.");
        return Ok(());
    }
    let mut twin = Twin::open(config)?;
    let (changes, edits) = twin.update(&update)?;
    for change in &changes {
        println!("{}", change);
    }
    finish(&mut twin, &edits)
}

pub fn evaluate(config: TwinConfig, sync: bool) -> Result<()> {
    let mut twin = Twin::open(config)?;
    let (report, mut edits) = twin.evaluate(Utc::now())?;
    for line in report.summary() {
        println!("{}", line);
    }
    if sync {
        let (synced, sync_log) = twin.sync_all()?;
        for zone in synced.iter().filter(|z| z.rebound > 0) {
            println!("{}", zone);
        }
        edits.extend(sync_log);
    }
    finish(&mut twin, &edits)
}

pub fn apply(config: TwinConfig, file: &Path) -> Result<()> {
    let batch = RecommendationBatch::load(file)?;
    let mut twin = Twin::open(config)?;
    let (report, edits) = twin.apply(&batch, Utc::now())?;
    for line in report.summary() {
        println!("{}", line);
    }
    finish(&mut twin, &edits)
}

pub fn sync(config: TwinConfig) -> Result<()> {
    let mut twin = Twin::open(config)?;
    let (synced, edits) = twin.sync_all()?;
    for zone in &synced {
        println!("{}", zone);
    }
    finish(&mut twin, &edits)
}

pub fn zone(config: TwinConfig, id: &str, status: Option<&str>, list: bool) -> Result<()> {
    let zone = ZoneId::parse(id)?;
    let status = status.map(str::parse::<ZoneStatus>).transpose()?;
    let mut twin = Twin::open(config)?;

    if list {
        let entities = twin.zone_entities(zone)?;
        println!("{}: {} plant(s)", zone, entities.len());
        for entity in entities {
            println!("  {}", entity);
        }
    }

    if status.is_none() && list {
        return Ok(());
    }
    let (sync, edits) = twin.sync_zone(zone, status)?;
    println!("{}", sync);
    finish(&mut twin, &edits)
}

pub fn snapshot(config: TwinConfig, from_file: Option<&Path>, default: bool) -> Result<()> {
    let snapshot = match from_file {
        Some(path) => ContextSnapshot::load(path)?,
        None if default => ContextSnapshot::default_context(&config.defaults),
        None => Twin::open(config)?.snapshot()?,
    };
    println!("{}", snapshot.to_json()?);
    Ok(())
}
