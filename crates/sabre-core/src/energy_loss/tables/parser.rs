use super::TableError;

const MATERIAL_DELIMITER: &str = "---------------------------------";
const BEGIN_BLOCK: &str = "begin_theta";
const END_BLOCK: &str = "end_theta";
/// Upper bound on angle bins a parameter line may declare.
const MAX_ANGLE_BINS: usize = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct AngleBlock {
    /// Nominal incidence angle of the block, degrees.
    pub theta: f64,
    /// `(observed, value)` samples in file order.
    pub samples: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AngleTableData {
    pub projectile: String,
    pub material: String,
    pub theta_min: f64,
    pub theta_max: f64,
    pub theta_step: f64,
    pub blocks: Vec<AngleBlock>,
}

fn expected_bins(min: f64, max: f64, step: f64) -> Result<usize, TableError> {
    // Small slack so a step that divides the range exactly is not lost to rounding.
    let intervals = ((max - min) / step + 1.0e-9).floor();
    if !intervals.is_finite() || intervals < 0.0 || intervals >= MAX_ANGLE_BINS as f64 {
        return Err(TableError::Parameters {
            reason: format!(
                "angle range [{min}, {max}] with step {step} does not give at most \
                 {MAX_ANGLE_BINS} bins"
            ),
        });
    }
    (intervals as usize)
        .checked_add(1)
        .ok_or_else(|| TableError::Parameters {
            reason: format!("bin count overflows for step {step}"),
        })
}

/// Parses the header, the angle parameters and every `begin_theta` block of
/// an angle-binned table.
pub fn parse_angle_table(source: &str) -> Result<AngleTableData, TableError> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (line, projectile_line) = lines.next().ok_or_else(|| TableError::Header {
        line: 1,
        reason: "table is empty".to_string(),
    })?;
    let projectile = projectile_line
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| TableError::Header {
            line,
            reason: "projectile line needs a third token".to_string(),
        })?
        .to_string();

    let (line, _) = lines.next().ok_or_else(|| TableError::Header {
        line: line + 1,
        reason: "missing material composition heading".to_string(),
    })?;

    let mut material = String::new();
    let mut last_line = line;
    loop {
        let (line, row) = lines.next().ok_or_else(|| TableError::Header {
            line: last_line + 1,
            reason: "material composition is not terminated by the delimiter row".to_string(),
        })?;
        last_line = line;
        let tokens: Vec<&str> = row.split_whitespace().collect();
        if tokens.first() == Some(&MATERIAL_DELIMITER) {
            break;
        }
        if tokens.len() != 3 {
            return Err(TableError::Header {
                line,
                reason: format!("material rows have 3 columns, found {}", tokens.len()),
            });
        }
        material.push_str(tokens[1]);
    }

    let (line, parameters) = lines.next().ok_or_else(|| TableError::Parameters {
        reason: format!("missing angle parameter line after line {last_line}"),
    })?;
    let tokens: Vec<&str> = parameters.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(TableError::Parameters {
            reason: format!("line {line}: expected `label min label max label step`"),
        });
    }
    let theta_min = parse_parameter(tokens[1], "theta_min")?;
    let theta_max = parse_parameter(tokens[3], "theta_max")?;
    let theta_step = parse_parameter(tokens[5], "theta_step")?;
    if !(theta_step > 0.0 && theta_max >= theta_min) {
        return Err(TableError::Parameters {
            reason: format!(
                "invalid angle range [{theta_min}, {theta_max}] with step {theta_step}"
            ),
        });
    }
    let expected = expected_bins(theta_min, theta_max, theta_step)?;

    let body: Vec<&str> = lines
        .map(|(_, line)| line)
        .skip_while(|line| line.split_whitespace().next() != Some(BEGIN_BLOCK))
        .flat_map(str::split_whitespace)
        .collect();
    let blocks = parse_blocks(&body)?;

    let data = AngleTableData {
        projectile,
        material,
        theta_min,
        theta_max,
        theta_step,
        blocks,
    };
    if data.blocks.len() != expected {
        return Err(TableError::BinCount {
            expected,
            found: data.blocks.len(),
        });
    }
    Ok(data)
}

fn parse_blocks(tokens: &[&str]) -> Result<Vec<AngleBlock>, TableError> {
    let mut blocks = Vec::new();
    let mut cursor = tokens.iter().copied();

    while let Some(token) = cursor.next() {
        if token != BEGIN_BLOCK {
            return Err(TableError::UnexpectedToken {
                token: token.to_string(),
            });
        }
        let theta_token = cursor
            .next()
            .ok_or(TableError::UnterminatedBlock { theta: f64::NAN })?;
        let theta = theta_token
            .parse::<f64>()
            .map_err(|_| TableError::UnexpectedToken {
                token: theta_token.to_string(),
            })?;

        let mut samples = Vec::new();
        loop {
            let observed = cursor
                .next()
                .ok_or(TableError::UnterminatedBlock { theta })?;
            if observed == END_BLOCK {
                break;
            }
            let value = cursor.next().ok_or_else(|| TableError::MalformedSample {
                theta,
                reason: format!("sample '{observed}' has no paired value"),
            })?;
            samples.push((parse_sample(observed, theta)?, parse_sample(value, theta)?));
        }
        blocks.push(AngleBlock { theta, samples });
    }
    Ok(blocks)
}

fn parse_parameter(token: &str, name: &str) -> Result<f64, TableError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| TableError::Parameters {
            reason: format!("invalid {name} '{token}'"),
        })
}

fn parse_sample(token: &str, theta: f64) -> Result<f64, TableError> {
    token
        .parse::<f64>()
        .map_err(|_| TableError::MalformedSample {
            theta,
            reason: format!("'{token}' is not a number"),
        })
}

#[cfg(test)]
mod tests {
    use super::parse_angle_table;
    use crate::energy_loss::tables::TableError;

    const HEADER: &str = "Incident projectile: 4He\n\
        Material composition:\n\
        13 27Al 1\n\
        ---------------------------------\n\
        theta_min: 0 theta_max: 10 theta_step: 5\n\
        E_final(MeV) E_loss(MeV)\n\
        generated with a fixed step\n";

    fn table(body: &str) -> String {
        format!("{HEADER}{body}")
    }

    #[test]
    fn parses_header_parameters_and_blocks() {
        let source = table(
            "begin_theta 0\n1.0 0.5\n2.0 0.4\nend_theta\n\
             begin_theta 5 end_theta\n\
             begin_theta 10\n1.0 0.6 2.0 0.45\nend_theta\n",
        );
        let data = parse_angle_table(&source).expect("table should parse");

        assert_eq!(data.projectile, "4He");
        assert_eq!(data.material, "27Al");
        assert_eq!((data.theta_min, data.theta_max, data.theta_step), (0.0, 10.0, 5.0));
        assert_eq!(data.blocks.len(), 3);
        assert_eq!(data.blocks[0].samples, vec![(1.0, 0.5), (2.0, 0.4)]);
        assert!(data.blocks[1].samples.is_empty());
        assert_eq!(data.blocks[2].theta, 10.0);
        assert_eq!(data.blocks[2].samples.len(), 2);
    }

    #[test]
    fn multi_row_materials_are_concatenated() {
        let source = "Incident projectile: 1H\nMaterial composition:\n\
            6 12C 1\n1 1H 2\n---------------------------------\n\
            theta_min: 0 theta_max: 0 theta_step: 1\n\
            begin_theta 0 1 2 3 4 end_theta\n";
        let data = parse_angle_table(source).expect("table should parse");
        assert_eq!(data.material, "12C1H");
        assert_eq!(data.blocks.len(), 1);
    }

    #[test]
    fn bin_count_must_match_angle_range() {
        let source = table("begin_theta 0\n1.0 0.5\nend_theta\n");
        let error = parse_angle_table(&source).expect_err("missing bins");
        assert!(matches!(
            error,
            TableError::BinCount {
                expected: 3,
                found: 1
            }
        ));
    }

    #[test]
    fn stray_tokens_and_open_blocks_are_rejected() {
        let stray = table("begin_theta 0 end_theta\nbogus\n");
        assert!(matches!(
            parse_angle_table(&stray),
            Err(TableError::UnexpectedToken { .. })
        ));

        let open = table("begin_theta 0\n1.0 0.5\n");
        assert!(matches!(
            parse_angle_table(&open),
            Err(TableError::UnterminatedBlock { .. })
        ));

        let odd = table("begin_theta 0\n1.0 0.5 2.0 end_theta\n");
        assert!(matches!(
            parse_angle_table(&odd),
            Err(TableError::MalformedSample { .. })
        ));
    }

    #[test]
    fn header_errors_are_reported() {
        assert!(matches!(
            parse_angle_table(""),
            Err(TableError::Header { .. })
        ));
        let no_delimiter = "Incident projectile: 4He\nMaterial composition:\n13 27Al 1\n";
        assert!(matches!(
            parse_angle_table(no_delimiter),
            Err(TableError::Header { .. })
        ));
        let bad_step = "Incident projectile: 4He\nMaterial composition:\n\
            ---------------------------------\n\
            theta_min: 0 theta_max: 10 theta_step: 0\n";
        assert!(matches!(
            parse_angle_table(bad_step),
            Err(TableError::Parameters { .. })
        ));
    }

    #[test]
    fn oversized_angle_ranges_are_parameter_errors() {
        let header = |parameters: &str| {
            format!(
                "Incident projectile: 4He\nMaterial composition:\n13 27Al 1\n\
                 ---------------------------------\n{parameters}\nbegin_theta 0 end_theta\n"
            )
        };
        for parameters in [
            "theta_min: 0 theta_max: 1e308 theta_step: 1e-308",
            "theta_min: -1e308 theta_max: 1e308 theta_step: 1",
            "theta_min: 0 theta_max: 90 theta_step: 1e-9",
        ] {
            let result = parse_angle_table(&header(parameters));
            assert!(
                matches!(result, Err(TableError::Parameters { .. })),
                "{parameters}: {result:?}"
            );
        }
    }
}
