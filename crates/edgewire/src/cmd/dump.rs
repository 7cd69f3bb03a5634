use edgewire_frame::ElementReader;
use tracing::debug;

use crate::cmd::{frame_config, open_input, DumpArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{ElementPrinter, OutputFormat};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args.input)?;
    let mut reader = ElementReader::with_config(input, frame_config(args.max_content));
    let mut printer = ElementPrinter::new(format);

    let mut decoded = 0usize;
    let mut printed = 0usize;
    let result = loop {
        if args.limit.is_some_and(|limit| printed >= limit) {
            break Ok(());
        }
        let elem = match reader.read_elem() {
            Ok(Some(elem)) => elem,
            Ok(None) => break Ok(()),
            Err(err) => {
                break Err(frame_error(
                    &format!("decode failed after {decoded} elements"),
                    err,
                ))
            }
        };
        let index = decoded;
        decoded += 1;

        if let Some(streams) = &args.stream {
            if !elem.stream_id().is_some_and(|id| streams.contains(&id)) {
                continue;
            }
        }

        if let Err(err) = printer.print(index, &elem) {
            break Err(err);
        }
        printed += 1;
    };

    // Whatever decoded cleanly is still shown when the capture is damaged.
    let finished = printer.finish();
    debug!(decoded, printed, "dump finished");
    result.and(finished).map(|()| SUCCESS)
}
