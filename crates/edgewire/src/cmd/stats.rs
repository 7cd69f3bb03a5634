use std::collections::BTreeMap;
use std::io::{self, Write};

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use edgewire_frame::{Element, ElementReader};
use serde::Serialize;

use crate::cmd::{frame_config, open_input, StatsArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize, Default, Debug, PartialEq, Eq)]
struct StatsOutput {
    elements: usize,
    by_element_type: BTreeMap<&'static str, usize>,
    units_by_data_type: BTreeMap<&'static str, usize>,
    units_by_stream: BTreeMap<u8, usize>,
    sections: usize,
    final_sections: usize,
}

impl StatsOutput {
    fn record(&mut self, elem: &Element) {
        self.elements += 1;
        *self
            .by_element_type
            .entry(elem.element_type().name())
            .or_default() += 1;
        match elem {
            Element::Unit(unit) => {
                *self
                    .units_by_data_type
                    .entry(unit.data.data_type().name())
                    .or_default() += 1;
                *self.units_by_stream.entry(unit.stream_id).or_default() += 1;
            }
            Element::SosMarker(_) => self.sections += 1,
            Element::EosMarker(eos) if eos.is_final => self.final_sections += 1,
            _ => {}
        }
    }
}

pub fn run(args: StatsArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args.input)?;
    let reader = ElementReader::with_config(input, frame_config(args.max_content));

    let mut stats = StatsOutput::default();
    for elem in reader {
        let elem = elem.map_err(|err| {
            frame_error(
                &format!("decode failed after {} elements", stats.elements),
                err,
            )
        })?;
        stats.record(&elem);
    }

    print_stats(&stats, format).map_err(|err| io_error("write failed", err))?;
    Ok(SUCCESS)
}

fn print_stats(stats: &StatsOutput, format: OutputFormat) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string());
            writeln!(out, "{line}")?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["GROUP", "KEY", "COUNT"]);
            for (name, count) in &stats.by_element_type {
                table.add_row(vec!["element".to_string(), name.to_string(), count.to_string()]);
            }
            for (name, count) in &stats.units_by_data_type {
                table.add_row(vec!["data".to_string(), name.to_string(), count.to_string()]);
            }
            for (stream, count) in &stats.units_by_stream {
                table.add_row(vec![
                    "stream".to_string(),
                    stream.to_string(),
                    count.to_string(),
                ]);
            }
            writeln!(out, "{table}")?;
            writeln!(
                out,
                "{} elements, {} sections ({} final)",
                stats.elements, stats.sections, stats.final_sections
            )?;
        }
        OutputFormat::Pretty => {
            writeln!(out, "Capture Stats:")?;
            writeln!(out, "  Elements:         {}", stats.elements)?;
            writeln!(
                out,
                "  Sections:         {} ({} final)",
                stats.sections, stats.final_sections
            )?;
            for (name, count) in &stats.by_element_type {
                writeln!(out, "  {name:<28}{count}")?;
            }
            for (name, count) in &stats.units_by_data_type {
                writeln!(out, "  unit {name:<23}{count}")?;
            }
        }
        OutputFormat::Raw => {
            writeln!(out, "{}", stats.elements)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use edgewire_codec::{Data, LabeledInt};
    use edgewire_frame::{EosMarker, SosMarker, Unit};

    use super::*;

    fn int_unit(stream_id: u8) -> Element {
        Unit {
            stream_id,
            channel: 1,
            elapsed_time: Duration::ZERO,
            data: Data::Int(LabeledInt {
                label: "rpm".into(),
                value: 900,
            }),
        }
        .into()
    }

    #[test]
    fn record_counts_sections_and_units() {
        let mut stats = StatsOutput::default();
        let elems = [
            SosMarker {
                stream_id: 1,
                serial_number: 0,
            }
            .into(),
            int_unit(1),
            int_unit(2),
            EosMarker {
                stream_id: 1,
                is_final: true,
                serial_number: 0,
            }
            .into(),
        ];
        for elem in &elems {
            stats.record(elem);
        }

        assert_eq!(stats.elements, 4);
        assert_eq!(stats.sections, 1);
        assert_eq!(stats.final_sections, 1);
        assert_eq!(stats.by_element_type.get("unit"), Some(&2));
        assert_eq!(stats.units_by_data_type.get("INT"), Some(&2));
        assert_eq!(stats.units_by_stream.get(&2), Some(&1));
    }

    #[test]
    fn json_keys_are_stable() {
        let mut stats = StatsOutput::default();
        stats.record(&int_unit(3));
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["elements"], 1);
        assert_eq!(value["units_by_stream"]["3"], 1);
    }
}
