use std::io::{BufRead, Write};

use anyhow::Result;

pub const COUNTRY_COUNT: usize = 3;

/// Ask for `count` names, one line each. End of input yields empty names.
pub fn read_names<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    count: usize,
) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(count);
    for i in 1..=count {
        write!(output, "Enter the name of country #{}: ", i)?;
        output.flush()?;
        let mut line = String::new();
        input.read_line(&mut line)?;
        names.push(line.trim().to_string());
    }
    Ok(names)
}
