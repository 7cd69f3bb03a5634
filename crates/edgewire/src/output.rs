use std::io::{IsTerminal, Stdout, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use edgewire_codec::{BulkSample, Data, Filter};
use edgewire_frame::{Element, ElementWriter, ResultCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::exit::{frame_error, io_error, CliResult};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ElementOutput<'a> {
    index: usize,
    element_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    req_id: Option<u8>,
    detail: Value,
}

/// Prints decoded elements one at a time.
///
/// Tables are collected and printed by [`ElementPrinter::finish`]; raw output
/// re-encodes each element so a filtered capture can be piped onward.
pub struct ElementPrinter {
    format: OutputFormat,
    table: Table,
    raw: Option<ElementWriter<Stdout>>,
}

impl ElementPrinter {
    pub fn new(format: OutputFormat) -> Self {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["#", "TYPE", "STREAM", "DETAIL"]);
        let raw = matches!(format, OutputFormat::Raw).then(|| ElementWriter::new(std::io::stdout()));
        Self { format, table, raw }
    }

    pub fn print(&mut self, index: usize, elem: &Element) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                let out = ElementOutput {
                    index,
                    element_type: elem.element_type().name(),
                    stream_id: elem.stream_id(),
                    req_id: elem.req_id(),
                    detail: element_detail(elem),
                };
                let line = serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string());
                writeln!(std::io::stdout(), "{line}")
                    .map_err(|err| io_error("write failed", err))?;
            }
            OutputFormat::Table => {
                self.table.add_row(vec![
                    index.to_string(),
                    elem.element_type().name().to_string(),
                    elem.stream_id().map(|id| id.to_string()).unwrap_or_default(),
                    summary(elem),
                ]);
            }
            OutputFormat::Pretty => {
                let scope = match (elem.stream_id(), elem.req_id()) {
                    (Some(stream), _) => format!(" stream={stream}"),
                    (None, Some(req)) => format!(" req={req}"),
                    (None, None) => String::new(),
                };
                writeln!(
                    std::io::stdout(),
                    "#{index} {}{scope} {}",
                    elem.element_type().name(),
                    summary(elem)
                )
                .map_err(|err| io_error("write failed", err))?;
            }
            OutputFormat::Raw => {
                if let Some(writer) = self.raw.as_mut() {
                    writer
                        .write_elem(elem)
                        .map_err(|err| frame_error("write failed", err))?;
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> CliResult<()> {
        if matches!(self.format, OutputFormat::Table) {
            writeln!(std::io::stdout(), "{}", self.table)
                .map_err(|err| io_error("write failed", err))?;
        }
        Ok(())
    }
}

pub fn result_label(code: ResultCode) -> String {
    match code {
        ResultCode::Ok => "OK".to_string(),
        ResultCode::Ng => "NG".to_string(),
        ResultCode::Other(other) => format!("0x{other:02x}"),
    }
}

pub fn element_detail(elem: &Element) -> Value {
    match elem {
        Element::UpstreamSpecRequest(req) => json!({
            "specs": req.specs.iter().map(|spec| json!({
                "stream_id": spec.stream_id,
                "store": spec.store,
                "resend": spec.resend,
                "measurement_uuid": spec.measurement_uuid.to_string(),
                "src_edge_uuid": spec.src_edge_uuid.to_string(),
                "dst_edge_uuids": spec.dst_edge_uuids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        }),
        Element::DownstreamSpecRequest(req) => json!({
            "specs": req.specs.iter().map(|spec| json!({
                "stream_id": spec.stream_id,
                "src_edge_uuid": spec.src_edge_uuid.to_string(),
                "dst_edge_uuid": spec.dst_edge_uuid.to_string(),
            })).collect::<Vec<_>>(),
        }),
        Element::DownstreamFilterRequest(req) => json!({
            "filters": req.filters.iter().map(|stream| json!({
                "stream_id": stream.stream_id,
                "data_filters": stream.data_filters.iter().map(|df| json!({
                    "channel": df.channel,
                    "data_type": df.filter.data_type().name(),
                    "filter": filter_detail(&df.filter),
                })).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        }),
        Element::UpstreamSpecResponse(resp) => json!({ "result_code": result_label(resp.result_code) }),
        Element::DownstreamSpecResponse(resp) => json!({ "result_code": result_label(resp.result_code) }),
        Element::DownstreamFilterResponse(resp) => json!({ "result_code": result_label(resp.result_code) }),
        Element::MeasurementIdRequest(req) => json!({ "edge_uuid": req.edge_uuid.to_string() }),
        Element::MeasurementIdResponse(resp) => json!({
            "result_code": result_label(resp.result_code),
            "measurement_uuid": resp.measurement_uuid.to_string(),
        }),
        Element::SosMarker(sos) => json!({ "serial_number": sos.serial_number }),
        Element::EosMarker(eos) => json!({
            "final": eos.is_final,
            "serial_number": eos.serial_number,
        }),
        Element::SectionAck(ack) => json!({
            "result_code": result_label(ack.result_code),
            "serial_number": ack.serial_number,
        }),
        Element::Unit(unit) => json!({
            "channel": unit.channel,
            "elapsed_time": unit.elapsed_time.as_secs_f64(),
            "data": data_detail(&unit.data),
        }),
    }
}

fn filter_detail(filter: &Filter) -> Value {
    match filter {
        Filter::Id { specs, .. } => json!({
            "kind": "id",
            "rules": specs.iter().map(|spec| json!({
                "mask": format!("0x{:x}", spec.mask),
                "result": format!("0x{:x}", spec.result),
                "accept": spec.accept,
            })).collect::<Vec<_>>(),
        }),
        Filter::Label { labels, .. } => json!({ "kind": "label", "labels": labels }),
        Filter::Any(_) => json!({ "kind": "any" }),
    }
}

fn samples_detail(samples: &[BulkSample]) -> Vec<Value> {
    samples
        .iter()
        .map(|s| json!({ "usec": s.usec, "data": hex::encode(&s.data) }))
        .collect()
}

pub fn data_detail(data: &Data) -> Value {
    let mut detail = match data {
        Data::Can(can) => json!({
            "id": format!("0x{:03x}", can.id),
            "dlc": can.dlc(),
            "data": hex::encode(&can.data),
        }),
        Data::CanBulk(bulk) => json!({
            "entries": bulk.entries.iter().map(|e| json!({
                "id": format!("0x{:03x}", e.id),
                "dlc": e.dlc,
                "samples": samples_detail(&e.samples),
            })).collect::<Vec<_>>(),
        }),
        Data::Nmea(nmea) => json!({
            "sentence_id": nmea.sentence_id(),
            "sentence": nmea.sentence,
        }),
        Data::GeneralSensor(sensor) => json!({
            "id": format!("0x{:04x}", sensor.id),
            "data": hex::encode(&sensor.data),
        }),
        Data::GeneralSensorBulk(bulk) => json!({
            "entries": bulk.entries.iter().map(|e| json!({
                "id": format!("0x{:04x}", e.id),
                "len": e.len,
                "samples": samples_detail(&e.samples),
            })).collect::<Vec<_>>(),
        }),
        Data::Jpeg(jpeg) => json!({ "size": jpeg.data.len() }),
        Data::H264(h264) => json!({ "type_id": h264.type_id, "size": h264.data.len() }),
        Data::Aac(aac) => json!({ "size": aac.data.len() }),
        Data::Pcm(pcm) => json!({
            "format_id": pcm.format_id,
            "channels": pcm.channels,
            "sample_rate": pcm.sample_rate,
            "bits_per_sample": pcm.bits_per_sample,
            "size": pcm.data.len(),
        }),
        Data::Controlpad(pad) => json!({ "id": pad.id, "data": hex::encode(&pad.data) }),
        Data::Mavlink(msg) => json!({
            "start": msg.start,
            "seq": msg.seq,
            "sys_id": msg.sys_id,
            "comp_id": msg.comp_id,
            "msg_id": msg.msg_id,
            "payload": hex::encode(&msg.payload),
            "checksum": msg.checksum,
        }),
        Data::Generic(generic) => json!({
            "id": format!("0x{:08x}", generic.id),
            "data": hex::encode(&generic.data),
        }),
        Data::Float(v) => json!({ "label": v.label, "value": v.value }),
        Data::Int(v) => json!({ "label": v.label, "value": v.value }),
        Data::String(v) => json!({ "label": v.label, "value": v.value }),
        Data::Bytes(v) => json!({ "label": v.label, "value": hex::encode(&v.value) }),
        Data::Basetime(bt) => json!({
            "kind": bt.kind,
            "sec": bt.sec,
            "nsec": bt.nsec,
        }),
    };
    if let Value::Object(map) = &mut detail {
        map.insert(
            "data_type".to_string(),
            Value::from(data.data_type().name()),
        );
    }
    detail
}

/// One-line description used by the table and pretty formats.
pub fn summary(elem: &Element) -> String {
    match elem {
        Element::UpstreamSpecRequest(req) => req
            .specs
            .iter()
            .map(|s| format!("stream={} dsts={}", s.stream_id, s.dst_edge_uuids.len()))
            .collect::<Vec<_>>()
            .join("; "),
        Element::DownstreamSpecRequest(req) => req
            .specs
            .iter()
            .map(|s| format!("stream={} src={}", s.stream_id, s.src_edge_uuid))
            .collect::<Vec<_>>()
            .join("; "),
        Element::DownstreamFilterRequest(req) => req
            .filters
            .iter()
            .map(|f| format!("stream={} filters={}", f.stream_id, f.data_filters.len()))
            .collect::<Vec<_>>()
            .join("; "),
        Element::UpstreamSpecResponse(resp) => result_label(resp.result_code),
        Element::DownstreamSpecResponse(resp) => result_label(resp.result_code),
        Element::DownstreamFilterResponse(resp) => result_label(resp.result_code),
        Element::MeasurementIdRequest(req) => format!("edge={}", req.edge_uuid),
        Element::MeasurementIdResponse(resp) => format!(
            "{} measurement={}",
            result_label(resp.result_code),
            resp.measurement_uuid
        ),
        Element::SosMarker(sos) => format!("serial={}", sos.serial_number),
        Element::EosMarker(eos) => format!("serial={} final={}", eos.serial_number, eos.is_final),
        Element::SectionAck(ack) => {
            format!("serial={} {}", ack.serial_number, result_label(ack.result_code))
        }
        Element::Unit(unit) => format!(
            "ch={} t={:.6}s {}",
            unit.channel,
            unit.elapsed_time.as_secs_f64(),
            data_summary(&unit.data)
        ),
    }
}

fn data_summary(data: &Data) -> String {
    let name = data.data_type().name();
    match data {
        Data::Can(can) => {
            format!("{name} id=0x{:03x} data={}", can.id, hex::encode(&can.data))
        }
        Data::CanBulk(bulk) => format!("{name} entries={}", bulk.entries.len()),
        Data::Nmea(nmea) => format!("{name} {}", nmea.sentence.trim_end()),
        Data::GeneralSensor(s) => {
            format!("{name} id=0x{:04x} data={}", s.id, hex::encode(&s.data))
        }
        Data::GeneralSensorBulk(bulk) => format!("{name} entries={}", bulk.entries.len()),
        Data::Jpeg(v) => format!("{name} {} bytes", v.data.len()),
        Data::H264(v) => format!("{name} type={} {} bytes", v.type_id, v.data.len()),
        Data::Aac(v) => format!("{name} {} bytes", v.data.len()),
        Data::Pcm(v) => format!(
            "{name} {}ch {}Hz {}bit {} bytes",
            v.channels,
            v.sample_rate,
            v.bits_per_sample,
            v.data.len()
        ),
        Data::Controlpad(v) => format!("{name} id={} data={}", v.id, hex::encode(&v.data)),
        Data::Mavlink(v) => format!("{name} msg={} seq={} sys={}", v.msg_id, v.seq, v.sys_id),
        Data::Generic(v) => format!("{name} id=0x{:08x} {} bytes", v.id, v.data.len()),
        Data::Float(v) => format!("{name} {}={}", v.label, v.value),
        Data::Int(v) => format!("{name} {}={}", v.label, v.value),
        Data::String(v) => format!("{name} {}={:?}", v.label, v.value),
        Data::Bytes(v) => format!("{name} {}={}", v.label, hex::encode(&v.value)),
        Data::Basetime(v) => format!("{name} kind={} {}.{:09}", v.kind, v.sec, v.nsec),
    }
}
