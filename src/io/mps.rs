// Free-format MPS reader.
//
// Fields are whitespace separated, so names must not contain blanks. Lines
// starting with `*` are comments. The first `N` row is the objective and
// further `N` rows are ignored. Columns default to `[0, +inf)`; that
// includes integer columns declared between `INTORG`/`INTEND` markers.
// A ranged row becomes two constraints, `<row>_lo` and `<row>_hi`.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{
    Bounds, ConstraintType, LinearExpr, Model, OptError, OptimizationType, Result, VariableType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Start,
    ObjSense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    Objective,
    Free,
    Less,
    Greater,
    Equal,
}

#[derive(Debug)]
struct RowDef {
    name: String,
    kind: RowKind,
    terms: Vec<(usize, f64)>,
    rhs: f64,
    range: Option<f64>,
}

#[derive(Debug)]
struct ColumnDef {
    name: String,
    variable_type: VariableType,
    lower: f64,
    upper: f64,
    lower_set: bool,
}

#[derive(Debug, Default)]
struct Reader {
    name: String,
    sense: OptimizationType,
    objective_row: Option<usize>,
    rows: Vec<RowDef>,
    row_index: HashMap<String, usize>,
    columns: Vec<ColumnDef>,
    column_index: HashMap<String, usize>,
    in_integer_block: bool,
    objective_constant: f64,
}

fn mps_error(line: usize, message: impl Into<String>) -> OptError {
    OptError::Mps {
        line,
        message: message.into(),
    }
}

fn number(token: &str, line: usize) -> Result<f64> {
    let value = token
        .parse::<f64>()
        .map_err(|_| mps_error(line, format!("expected a number, found '{}'", token)))?;
    if value.is_nan() {
        return Err(mps_error(line, "NaN is not a valid value"));
    }
    Ok(value)
}

/// Parse an MPS document into a model.
pub fn parse_mps(text: &str) -> Result<Model> {
    let mut reader = Reader::default();
    let mut section = Section::Start;

    for (offset, raw) in text.lines().enumerate() {
        let line = offset + 1;
        if raw.trim().is_empty() || raw.starts_with('*') {
            continue;
        }
        let tokens: Vec<&str> = raw.split_whitespace().collect();

        if !raw.starts_with(char::is_whitespace) {
            section = reader.header(&tokens, line)?;
            if section == Section::End {
                break;
            }
            continue;
        }

        match section {
            Section::Start => return Err(mps_error(line, "data line before any section")),
            Section::ObjSense => reader.sense = parse_sense(tokens[0], line)?,
            Section::Rows => reader.row(&tokens, line)?,
            Section::Columns => reader.column(&tokens, line)?,
            Section::Rhs => reader.rhs(&tokens, line)?,
            Section::Ranges => reader.range(&tokens, line)?,
            Section::Bounds => reader.bound(&tokens, line)?,
            Section::End => break,
        }
    }

    if section != Section::End {
        warn!(component = "mps", "missing ENDATA, reading to end of input");
    }
    reader.into_model()
}

/// Read and parse an MPS file.
pub fn read_mps_file(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let model = parse_mps(&text)?;
    debug!(
        component = "mps",
        path = %path.display(),
        variables = model.num_variables(),
        constraints = model.num_constraints(),
        "model imported"
    );
    Ok(model)
}

fn parse_sense(token: &str, line: usize) -> Result<OptimizationType> {
    match token.to_ascii_uppercase().as_str() {
        "MAX" | "MAXIMIZE" | "MAXIMISE" => Ok(OptimizationType::Maximize),
        "MIN" | "MINIMIZE" | "MINIMISE" => Ok(OptimizationType::Minimize),
        other => Err(mps_error(line, format!("unknown objective sense '{}'", other))),
    }
}

impl Reader {
    fn header(&mut self, tokens: &[&str], line: usize) -> Result<Section> {
        let section = match tokens[0] {
            "NAME" => {
                self.name = tokens[1..].join(" ");
                Section::Start
            }
            "OBJSENSE" => {
                if let Some(sense) = tokens.get(1) {
                    self.sense = parse_sense(sense, line)?;
                }
                Section::ObjSense
            }
            "ROWS" => Section::Rows,
            "COLUMNS" => Section::Columns,
            "RHS" => Section::Rhs,
            "RANGES" => Section::Ranges,
            "BOUNDS" => Section::Bounds,
            "ENDATA" => Section::End,
            other => return Err(mps_error(line, format!("unknown section '{}'", other))),
        };
        Ok(section)
    }

    fn row(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        let [kind, name] = tokens else {
            return Err(mps_error(line, "ROWS entries need a type and a name"));
        };
        let kind = match kind.to_ascii_uppercase().as_str() {
            "N" if self.objective_row.is_none() => RowKind::Objective,
            "N" => RowKind::Free,
            "L" => RowKind::Less,
            "G" => RowKind::Greater,
            "E" => RowKind::Equal,
            other => return Err(mps_error(line, format!("unknown row type '{}'", other))),
        };
        if self.row_index.contains_key(*name) {
            return Err(mps_error(line, format!("row '{}' declared twice", name)));
        }
        let index = self.rows.len();
        if kind == RowKind::Objective {
            self.objective_row = Some(index);
        }
        self.row_index.insert(name.to_string(), index);
        self.rows.push(RowDef {
            name: name.to_string(),
            kind,
            terms: Vec::new(),
            rhs: 0.0,
            range: None,
        });
        Ok(())
    }

    fn row_of(&self, name: &str, line: usize) -> Result<usize> {
        self.row_index
            .get(name)
            .copied()
            .ok_or_else(|| mps_error(line, format!("unknown row '{}'", name)))
    }

    fn column_of(&self, name: &str, line: usize) -> Result<usize> {
        self.column_index
            .get(name)
            .copied()
            .ok_or_else(|| mps_error(line, format!("unknown column '{}'", name)))
    }

    fn column(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        if tokens.len() >= 3 && tokens[1].trim_matches('\'') == "MARKER" {
            match tokens[2].trim_matches('\'') {
                "INTORG" => self.in_integer_block = true,
                "INTEND" => self.in_integer_block = false,
                other => return Err(mps_error(line, format!("unknown marker '{}'", other))),
            }
            return Ok(());
        }
        if tokens.len() != 3 && tokens.len() != 5 {
            return Err(mps_error(
                line,
                "COLUMNS entries need a column and one or two row/value pairs",
            ));
        }

        let name = tokens[0];
        let column = match self.column_index.get(name) {
            Some(&index) => index,
            None => {
                let index = self.columns.len();
                self.column_index.insert(name.to_string(), index);
                self.columns.push(ColumnDef {
                    name: name.to_string(),
                    variable_type: if self.in_integer_block {
                        VariableType::Integer
                    } else {
                        VariableType::Continuous
                    },
                    lower: 0.0,
                    upper: f64::INFINITY,
                    lower_set: false,
                });
                index
            }
        };

        for pair in tokens[1..].chunks(2) {
            let row = self.row_of(pair[0], line)?;
            let value = number(pair[1], line)?;
            if !value.is_finite() {
                return Err(mps_error(line, format!("coefficient {} is not finite", value)));
            }
            self.rows[row].terms.push((column, value));
        }
        Ok(())
    }

    /// Row/value pairs of RHS and RANGES lines, with the optional set name skipped.
    fn pairs<'t>(tokens: &'t [&'t str], line: usize, section: &str) -> Result<&'t [&'t str]> {
        match tokens.len() {
            2 | 4 => Ok(tokens),
            3 | 5 => Ok(&tokens[1..]),
            _ => Err(mps_error(
                line,
                format!("{} entries need one or two row/value pairs", section),
            )),
        }
    }

    fn rhs(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        for pair in Self::pairs(tokens, line, "RHS")?.chunks(2) {
            let row = self.row_of(pair[0], line)?;
            let value = number(pair[1], line)?;
            if Some(row) == self.objective_row {
                self.objective_constant = -value;
            } else {
                self.rows[row].rhs = value;
            }
        }
        Ok(())
    }

    fn range(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        for pair in Self::pairs(tokens, line, "RANGES")?.chunks(2) {
            let row = self.row_of(pair[0], line)?;
            let value = number(pair[1], line)?;
            if matches!(self.rows[row].kind, RowKind::Objective | RowKind::Free) {
                return Err(mps_error(
                    line,
                    format!("range on free row '{}'", self.rows[row].name),
                ));
            }
            self.rows[row].range = Some(value);
        }
        Ok(())
    }

    fn bound(&mut self, tokens: &[&str], line: usize) -> Result<()> {
        let kind = tokens[0].to_ascii_uppercase();
        let needs_value = matches!(kind.as_str(), "UP" | "LO" | "FX" | "LI" | "UI");

        let (column_name, value) = match (needs_value, tokens.len()) {
            (true, 3) => (tokens[1], Some(number(tokens[2], line)?)),
            (true, 4) => (tokens[2], Some(number(tokens[3], line)?)),
            (false, 2) => (tokens[1], None),
            (false, 3) if kind == "BV" && self.column_index.contains_key(tokens[1]) => {
                (tokens[1], None)
            }
            (false, 3) => (tokens[2], None),
            (false, 4) => (tokens[2], None),
            _ => return Err(mps_error(line, format!("malformed {} bound", kind))),
        };
        let index = self.column_of(column_name, line)?;
        let column = &mut self.columns[index];
        let value = value.unwrap_or_default();

        match kind.as_str() {
            "UP" | "UI" => {
                column.upper = value;
                if value < 0.0 && !column.lower_set && column.lower == 0.0 {
                    warn!(
                        component = "mps",
                        line,
                        column = %column.name,
                        "negative upper bound with default lower bound, lower set to -inf"
                    );
                    column.lower = f64::NEG_INFINITY;
                }
                if kind == "UI" {
                    column.variable_type = VariableType::Integer;
                }
            }
            "LO" | "LI" => {
                column.lower = value;
                column.lower_set = true;
                if kind == "LI" {
                    column.variable_type = VariableType::Integer;
                }
            }
            "FX" => {
                column.lower = value;
                column.upper = value;
                column.lower_set = true;
            }
            "FR" => {
                column.lower = f64::NEG_INFINITY;
                column.upper = f64::INFINITY;
                column.lower_set = true;
            }
            "MI" => {
                column.lower = f64::NEG_INFINITY;
                column.lower_set = true;
            }
            "PL" => column.upper = f64::INFINITY,
            "BV" => {
                column.variable_type = VariableType::Binary;
                column.lower = 0.0;
                column.upper = 1.0;
                column.lower_set = true;
            }
            other => return Err(mps_error(line, format!("unknown bound type '{}'", other))),
        }
        Ok(())
    }

    fn into_model(self) -> Result<Model> {
        let mut model = Model::new().with_name(self.name);
        let handles = self
            .columns
            .iter()
            .map(|c| {
                model.declare_variable(
                    c.name.clone(),
                    c.variable_type,
                    Bounds::new(c.lower, c.upper),
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let expr = |terms: &[(usize, f64)]| {
            LinearExpr::from_terms(terms.iter().map(|&(i, c)| (handles[i], c)))
        };

        for row in &self.rows {
            let relation = match row.kind {
                RowKind::Objective | RowKind::Free => continue,
                RowKind::Less => ConstraintType::LessThanOrEqual,
                RowKind::Greater => ConstraintType::GreaterThanOrEqual,
                RowKind::Equal => ConstraintType::Equal,
            };
            let Some(range) = row.range else {
                model.add_named_constraint(row.name.clone(), expr(&row.terms), relation, row.rhs)?;
                continue;
            };

            let (low, high) = match relation {
                ConstraintType::LessThanOrEqual => (row.rhs - range.abs(), row.rhs),
                ConstraintType::GreaterThanOrEqual => (row.rhs, row.rhs + range.abs()),
                _ if range >= 0.0 => (row.rhs, row.rhs + range),
                _ => (row.rhs + range, row.rhs),
            };
            model.add_named_constraint(
                format!("{}_lo", row.name),
                expr(&row.terms),
                ConstraintType::GreaterThanOrEqual,
                low,
            )?;
            model.add_named_constraint(
                format!("{}_hi", row.name),
                expr(&row.terms),
                ConstraintType::LessThanOrEqual,
                high,
            )?;
        }

        let objective = self
            .objective_row
            .map(|row| expr(&self.rows[row].terms))
            .unwrap_or_default()
            .with_constant(self.objective_constant);
        model.set_objective(objective, self.sense)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
* sample problem
NAME          SAMPLE
OBJSENSE
    MAX
ROWS
 N  obj
 L  cap
 G  demand
 E  balance
COLUMNS
    x         obj       3.0        cap       2.0
    x         balance   1.0
    MARKER    'MARKER'  'INTORG'
    n         obj       1.0        cap       1.0
    n         demand    1.0
    MARKER    'MARKER'  'INTEND'
    y         obj       -1.0       balance   -1.0
RHS
    RHS       cap       10.0       demand    1.0
    RHS       obj       -4.0
RANGES
    RNG       balance   2.0
BOUNDS
 UP BND       x         4.0
 FR BND       y
ENDATA
";

    #[test]
    fn reads_sections_into_the_model() {
        let model = parse_mps(SAMPLE).unwrap();
        assert_eq!(model.name(), "SAMPLE");
        assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
        assert_eq!(model.objective().constant, 4.0);
        assert_eq!(model.num_variables(), 3);

        let x = model.variable(model.handle_of("x").unwrap()).unwrap();
        assert_eq!(x.bounds, Bounds::new(0.0, 4.0));
        let n = model.variable(model.handle_of("n").unwrap()).unwrap();
        assert_eq!(n.variable_type, VariableType::Integer);
        assert_eq!(n.bounds, Bounds::non_negative());
        let y = model.variable(model.handle_of("y").unwrap()).unwrap();
        assert_eq!(y.bounds, Bounds::free());

        let names: Vec<_> = model.constraints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cap", "demand", "balance_lo", "balance_hi"]);
        assert_eq!(model.constraints()[0].rhs, 10.0);
        assert_eq!(model.constraints()[2].rhs, 0.0);
        assert_eq!(model.constraints()[3].rhs, 2.0);
    }

    #[test]
    fn objsense_on_the_header_line() {
        let text = "NAME T\nOBJSENSE MAX\nROWS\n N obj\nCOLUMNS\n x obj 1\nENDATA\n";
        let model = parse_mps(text).unwrap();
        assert_eq!(model.objective().optimization_type, OptimizationType::Maximize);
    }

    #[test]
    fn binary_and_negative_upper_bounds() {
        let text = "\
NAME T
ROWS
 N obj
COLUMNS
 b obj 1
 z obj 1
BOUNDS
 BV BND b
 UP BND z -3
ENDATA
";
        let model = parse_mps(text).unwrap();
        let b = model.variable(model.handle_of("b").unwrap()).unwrap();
        assert_eq!(b.variable_type, VariableType::Binary);
        assert_eq!(b.bounds, Bounds::binary());
        let z = model.variable(model.handle_of("z").unwrap()).unwrap();
        assert_eq!(z.bounds, Bounds::new(f64::NEG_INFINITY, -3.0));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let text = "NAME T\nROWS\n N obj\nCOLUMNS\n x nowhere 1\nENDATA\n";
        match parse_mps(text) {
            Err(OptError::Mps { line, message }) => {
                assert_eq!(line, 5);
                assert!(message.contains("nowhere"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let text = "NAME T\nROWS\n Q obj\nENDATA\n";
        assert!(matches!(parse_mps(text), Err(OptError::Mps { line: 3, .. })));

        let text = "NAME T\nROWS\n N obj\nCOLUMNS\n x obj abc\nENDATA\n";
        assert!(matches!(parse_mps(text), Err(OptError::Mps { line: 5, .. })));
    }
}
