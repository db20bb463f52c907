use std::process::Output;

use async_trait::async_trait;
use log::{debug, trace};
use tokio::process::Command;

use super::{Brightness, DisplayController, OutputId};
use crate::error::{StrobeError, StrobeResult};

/// Software brightness through the X11 `xrandr` tool
pub struct XrandrDisplay {
    program: String,
}

impl XrandrDisplay {
    pub fn new() -> Self {
        XrandrDisplay::with_program("xrandr")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        XrandrDisplay {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> StrobeResult<Output> {
        trace!("{} {}", &self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|err| StrobeError::device(format!("cannot run {}: {}", &self.program, err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StrobeError::device(format!(
                "{} {} exited with {}: {}",
                &self.program,
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl Default for XrandrDisplay {
    fn default() -> Self {
        XrandrDisplay::new()
    }
}

/// First output line flagged `primary` in `xrandr -q`
pub fn parse_primary_output(query: &str) -> Option<OutputId> {
    query.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        let name = tokens.next()?;
        let mut rest = tokens.take(2);
        if rest.next() == Some("connected") && rest.next() == Some("primary") {
            Some(OutputId::new(name))
        } else {
            None
        }
    })
}

#[async_trait]
impl DisplayController for XrandrDisplay {
    async fn identify_active_output(&self) -> StrobeResult<OutputId> {
        let output = self.run(&["-q"]).await?;
        let query = String::from_utf8_lossy(&output.stdout);
        let primary = parse_primary_output(&query)
            .ok_or_else(|| StrobeError::device("no primary output found in xrandr query"))?;
        debug!("Primary output {}", &primary);
        Ok(primary)
    }

    async fn set_brightness(&self, output: &OutputId, level: Brightness) -> StrobeResult<()> {
        let level = level.to_string();
        self.run(&["--output", output.as_str(), "--brightness", &level])
            .await?;
        Ok(())
    }
}
