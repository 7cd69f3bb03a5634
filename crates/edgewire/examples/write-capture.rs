//! Write a small capture: one upstream section with a few samples.
//!
//! Run with:
//!   cargo run --example write-capture -- /tmp/edgewire-sample.bin
//!
//! Then inspect it:
//!   cargo run --features cli -- dump /tmp/edgewire-sample.bin --format pretty

use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use edgewire::codec::{Basetime, Can, Data, LabeledFloat, Nmea};
use edgewire::frame::{Element, ElementWriter, EosMarker, SosMarker, Unit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "edgewire-sample.bin".to_string());
    let mut writer = ElementWriter::new(BufWriter::new(File::create(&path)?));

    let stream_id = 1;
    let unit = |channel, millis, data| -> Element {
        Unit {
            stream_id,
            channel,
            elapsed_time: Duration::from_millis(millis),
            data,
        }
        .into()
    };

    let mut elems: Vec<Element> = vec![SosMarker {
        stream_id,
        serial_number: 0,
    }
    .into()];
    elems.push(unit(
        0,
        0,
        Data::Basetime(Basetime {
            kind: 2,
            sec: 1_700_000_000,
            nsec: 0,
        }),
    ));
    for i in 0..10u64 {
        elems.push(unit(
            1,
            i * 100,
            Data::Can(Can {
                id: 0x123,
                data: vec![i as u8; 8].into(),
            }),
        ));
        elems.push(unit(
            2,
            i * 100 + 50,
            Data::Float(LabeledFloat {
                label: "speed".to_string(),
                value: 10.0 + i as f64 * 0.5,
            }),
        ));
    }
    elems.push(unit(
        3,
        1000,
        Data::Nmea(Nmea {
            sentence: "$GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,*76"
                .to_string(),
        }),
    ));
    elems.push(
        EosMarker {
            stream_id,
            is_final: true,
            serial_number: 0,
        }
        .into(),
    );

    writer.write_elems(&elems)?;
    eprintln!("Wrote {} elements to {path}", elems.len());
    Ok(())
}
