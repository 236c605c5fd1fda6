//! TCX document generation.
//!
//! Produces a Garmin TrainingCenterDatabase v2 document with one Activity,
//! one Lap and the ordered trackpoints. Power and speed go in the
//! ActivityExtension `TPX` block.

use super::types::{LapSummary, Trackpoint};
use crate::error::{ConvertError, ConvertResult};
use crate::session::Session;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

/// TCX XML namespaces
const NS_TCX: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const NS_TPX: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";

fn xml_err<E: std::fmt::Display>(e: E) -> ConvertError {
    ConvertError::Xml(e.to_string())
}

/// `YYYY-MM-DDTHH:MM:SSZ`, keeping milliseconds only when present.
pub fn format_time(time: DateTime<Utc>) -> String {
    let format = if time.timestamp_subsec_millis() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Millis
    };
    time.to_rfc3339_opts(format, true)
}

/// Render a TCX document in memory.
pub fn render_tcx(
    session: &Session,
    summary: &LapSummary,
    trackpoints: &[Trackpoint],
) -> ConvertResult<String> {
    if trackpoints.is_empty() {
        return Err(ConvertError::EmptySeries);
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut root = BytesStart::new("TrainingCenterDatabase");
    root.push_attribute(("xmlns", NS_TCX));
    root.push_attribute(("xmlns:ns3", NS_TPX));
    root.push_attribute(("xmlns:xsi", NS_XSI));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(root)).map_err(xml_err)?;

    start(&mut writer, "Activities")?;

    let mut activity = BytesStart::new("Activity");
    activity.push_attribute(("Sport", session.sport()));
    writer.write_event(Event::Start(activity)).map_err(xml_err)?;

    let start_time = format_time(session.start_time());
    write_element(&mut writer, "Id", &start_time)?;
    write_lap(&mut writer, &start_time, summary, trackpoints)?;

    end(&mut writer, "Activity")?;
    end(&mut writer, "Activities")?;
    end(&mut writer, "TrainingCenterDatabase")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(xml_err)
}

/// Render and write a TCX document to `path`.
///
/// A partially written file is removed before the error is returned.
pub fn write_tcx(
    path: &Path,
    session: &Session,
    summary: &LapSummary,
    trackpoints: &[Trackpoint],
) -> ConvertResult<()> {
    tracing::info!("Creating TCX file {}", path.display());
    let content = render_tcx(session, summary, trackpoints)?;

    let result = std::fs::File::create(path).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()
    });

    if let Err(source) = result {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove partial output {}: {}", path.display(), e);
            }
        }
        return Err(ConvertError::IoWrite {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

/// Output path next to the input: `ride.json` becomes `ride.tcx`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("tcx")
}

fn write_lap<W: std::io::Write>(
    writer: &mut Writer<W>,
    start_time: &str,
    summary: &LapSummary,
    trackpoints: &[Trackpoint],
) -> ConvertResult<()> {
    let mut lap = BytesStart::new("Lap");
    lap.push_attribute(("StartTime", start_time));
    writer.write_event(Event::Start(lap)).map_err(xml_err)?;

    write_element(
        writer,
        "TotalTimeSeconds",
        &format!("{:.1}", summary.total_time_seconds),
    )?;
    write_element(
        writer,
        "DistanceMeters",
        &format!("{:.1}", summary.total_distance_meters),
    )?;
    if let Some(max_speed) = summary.max_speed_mps {
        write_element(writer, "MaximumSpeed", &format!("{:.2}", max_speed))?;
    }
    write_element(writer, "Calories", "0")?;

    if let Some(avg_hr) = summary.avg_heart_rate_bpm {
        write_heart_rate_element(writer, "AverageHeartRateBpm", avg_hr)?;
    }
    if let Some(max_hr) = summary.max_heart_rate_bpm {
        write_heart_rate_element(writer, "MaximumHeartRateBpm", max_hr)?;
    }

    write_element(writer, "Intensity", "Active")?;
    if let Some(avg_cadence) = summary.avg_cadence_rpm {
        write_element(writer, "Cadence", &avg_cadence.to_string())?;
    }
    write_element(writer, "TriggerMethod", "Manual")?;

    start(writer, "Track")?;
    for trackpoint in trackpoints {
        write_trackpoint(writer, trackpoint)?;
    }
    end(writer, "Track")?;

    write_lap_extensions(writer, summary)?;

    end(writer, "Lap")
}

fn write_trackpoint<W: std::io::Write>(
    writer: &mut Writer<W>,
    trackpoint: &Trackpoint,
) -> ConvertResult<()> {
    start(writer, "Trackpoint")?;

    write_element(writer, "Time", &format_time(trackpoint.time))?;

    if let Some((lat, lon)) = trackpoint.position {
        start(writer, "Position")?;
        write_element(writer, "LatitudeDegrees", &format!("{:.7}", lat))?;
        write_element(writer, "LongitudeDegrees", &format!("{:.7}", lon))?;
        end(writer, "Position")?;
    }

    if let Some(altitude) = trackpoint.altitude_meters {
        write_element(writer, "AltitudeMeters", &format!("{:.1}", altitude))?;
    }

    write_element(
        writer,
        "DistanceMeters",
        &format!("{:.1}", trackpoint.distance_meters),
    )?;

    if let Some(hr) = trackpoint.heart_rate_bpm {
        write_heart_rate_element(writer, "HeartRateBpm", hr)?;
    }

    if let Some(cadence) = trackpoint.cadence_rpm {
        write_element(writer, "Cadence", &cadence.to_string())?;
    }

    write_trackpoint_extensions(writer, trackpoint)?;

    end(writer, "Trackpoint")
}

fn write_trackpoint_extensions<W: std::io::Write>(
    writer: &mut Writer<W>,
    trackpoint: &Trackpoint,
) -> ConvertResult<()> {
    if trackpoint.power_watts.is_none() && trackpoint.speed_mps.is_none() {
        return Ok(());
    }

    start(writer, "Extensions")?;
    start(writer, "ns3:TPX")?;

    if let Some(speed) = trackpoint.speed_mps {
        write_element(writer, "ns3:Speed", &format!("{:.2}", speed))?;
    }
    if let Some(power) = trackpoint.power_watts {
        write_element(writer, "ns3:Watts", &power.to_string())?;
    }

    end(writer, "ns3:TPX")?;
    end(writer, "Extensions")
}

fn write_lap_extensions<W: std::io::Write>(
    writer: &mut Writer<W>,
    summary: &LapSummary,
) -> ConvertResult<()> {
    if summary.avg_power_watts.is_none() && summary.max_power_watts.is_none() {
        return Ok(());
    }

    start(writer, "Extensions")?;
    start(writer, "ns3:LX")?;

    if let Some(avg_power) = summary.avg_power_watts {
        write_element(writer, "ns3:AvgWatts", &avg_power.to_string())?;
    }
    if let Some(max_power) = summary.max_power_watts {
        write_element(writer, "ns3:MaxWatts", &max_power.to_string())?;
    }

    end(writer, "ns3:LX")?;
    end(writer, "Extensions")
}

fn start<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> ConvertResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)
}

fn end<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> ConvertResult<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)
}

/// Write a simple element with text content.
fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> ConvertResult<()> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    end(writer, name)
}

/// Write a heart rate element with Value sub-element.
fn write_heart_rate_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: u8,
) -> ConvertResult<()> {
    start(writer, name)?;
    write_element(writer, "Value", &value.to_string())?;
    end(writer, name)
}
