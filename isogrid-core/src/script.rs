/// Line-oriented scene script parser
///
/// ```text
/// # comment
/// transform 20 5 0 -10 200 300
/// pan 10 -4
/// zoom 1.5 400 300
/// rotate 0.785 400 300
/// cell 0 0  0 1  1 1  1 0 height 2
/// grid 8 height 1
/// ```
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{space0, space1, u32 as parse_u32},
    combinator::{all_consuming, map, opt},
    multi::many1,
    number::complete::double,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::editor::{Edit, TransformEditor};
use crate::error::GeometryError;
use crate::geometry::{GridCell, Point};
use crate::grid::Grid;
use crate::scene::{Scene, SceneConfig};
use crate::transform::AffineTransform;

/// Largest `grid N` a script may request
pub const MAX_GRID_SIZE: u32 = 1024;

/// A script failure, tagged with its 1-based line number
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("line {line}: cannot parse `{text}`")]
    Syntax { line: usize, text: String },
    #[error("line {line}: grid size {size} exceeds the limit of {max}", max = MAX_GRID_SIZE)]
    GridTooLarge { line: usize, size: u32 },
    #[error("line {line}: {source}")]
    Geometry {
        line: usize,
        #[source]
        source: GeometryError,
    },
}

/// One parsed script statement
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start a fresh editing session at this transform
    Transform(AffineTransform),
    Edit(Edit),
    Cell { cell: GridCell, height: Option<f64> },
    Grid { size: u32, height: Option<f64> },
}

/// A command and the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub command: Command,
}

/// Raw command before geometric validation
enum RawCommand {
    Transform([f64; 6]),
    Edit(Edit),
    Cell { points: Vec<Point>, height: Option<f64> },
    Grid { size: u32, height: Option<f64> },
}

fn number(input: &str) -> IResult<&str, f64> {
    preceded(space1, double)(input)
}

fn point(input: &str) -> IResult<&str, Point> {
    map(pair(number, number), |(x, y)| Point::new(x, y))(input)
}

fn height_suffix(input: &str) -> IResult<&str, Option<f64>> {
    opt(preceded(pair(space1, tag("height")), number))(input)
}

fn transform_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("transform")(input)?;
    let (input, (a, b, c, d, e, f)) =
        tuple((number, number, number, number, number, number))(input)?;
    Ok((input, RawCommand::Transform([a, b, c, d, e, f])))
}

fn pan_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("pan")(input)?;
    let (input, (de, df)) = pair(number, number)(input)?;
    Ok((input, RawCommand::Edit(Edit::Pan { de, df })))
}

fn zoom_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("zoom")(input)?;
    let (input, (factor, pivot)) = pair(number, point)(input)?;
    Ok((input, RawCommand::Edit(Edit::Zoom { factor, pivot })))
}

fn rotate_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("rotate")(input)?;
    let (input, (angle, pivot)) = pair(number, point)(input)?;
    Ok((input, RawCommand::Edit(Edit::Rotate { angle, pivot })))
}

fn cell_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("cell")(input)?;
    let (input, points) = many1(point)(input)?;
    let (input, height) = height_suffix(input)?;
    Ok((input, RawCommand::Cell { points, height }))
}

fn grid_cmd(input: &str) -> IResult<&str, RawCommand> {
    let (input, _) = tag("grid")(input)?;
    let (input, size) = preceded(space1, parse_u32)(input)?;
    let (input, height) = height_suffix(input)?;
    Ok((input, RawCommand::Grid { size, height }))
}

fn command(input: &str) -> IResult<&str, RawCommand> {
    all_consuming(terminated(
        alt((transform_cmd, pan_cmd, zoom_cmd, rotate_cmd, cell_cmd, grid_cmd)),
        space0,
    ))(input)
}

fn check_height(height: Option<f64>) -> Result<Option<f64>, GeometryError> {
    match height {
        Some(h) if !(h.is_finite() && h >= 0.0) => Err(GeometryError::InvalidHeight(h)),
        other => Ok(other),
    }
}

fn validate(raw: RawCommand) -> Result<Command, GeometryError> {
    match raw {
        RawCommand::Transform([a, b, c, d, e, f]) => {
            let transform = AffineTransform::new(a, b, c, d, e, f);
            // Reuse the editor's own check for non-finite and singular transforms.
            TransformEditor::with_transform(transform)?;
            Ok(Command::Transform(transform))
        }
        RawCommand::Edit(edit) => {
            edit.to_transform()?;
            Ok(Command::Edit(edit))
        }
        RawCommand::Cell { points, height } => Ok(Command::Cell {
            cell: GridCell::from_points(&points)?,
            height: check_height(height)?,
        }),
        RawCommand::Grid { size, height } => Ok(Command::Grid {
            size,
            height: check_height(height)?,
        }),
    }
}

/// Parse and validate a whole script. Blank lines and `#` comments are skipped.
pub fn parse_script(input: &str) -> Result<Vec<Statement>, ScriptError> {
    let mut statements = Vec::new();

    for (index, raw_line) in input.lines().enumerate() {
        let line = index + 1;
        let text = raw_line.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let (_, raw) = command(text).map_err(|_| ScriptError::Syntax {
            line,
            text: text.to_string(),
        })?;
        if let RawCommand::Grid { size, .. } = &raw {
            if *size > MAX_GRID_SIZE {
                return Err(ScriptError::GridTooLarge { line, size: *size });
            }
        }
        let command = validate(raw).map_err(|source| ScriptError::Geometry { line, source })?;
        statements.push(Statement { line, command });
    }

    Ok(statements)
}

/// Run a script against `config`, producing the edited session and the scene.
///
/// Cells without an explicit height use `config.default_height`.
pub fn load_scene(input: &str, config: &SceneConfig) -> Result<(TransformEditor, Scene), ScriptError> {
    let geometry = |line: usize| move |source: GeometryError| ScriptError::Geometry { line, source };

    // Line 0 stands for the config's own starting transform.
    let mut editor =
        TransformEditor::with_transform(config.transform).map_err(geometry(0))?;
    let mut scene = Scene::new();

    for Statement { line, command } in parse_script(input)? {
        match command {
            Command::Transform(transform) => {
                editor = TransformEditor::with_transform(transform).map_err(geometry(line))?;
            }
            Command::Edit(edit) => {
                editor.apply(edit).map_err(geometry(line))?;
            }
            Command::Cell { cell, height } => {
                scene
                    .push(cell, height.unwrap_or(config.default_height))
                    .map_err(geometry(line))?;
            }
            Command::Grid { size, height } => {
                let height = height.unwrap_or(config.default_height);
                for (_, _, cell) in Grid::new(size).cells() {
                    scene.push(cell, height).map_err(geometry(line))?;
                }
            }
        }
    }

    log::debug!(
        "loaded scene with {} cells after {} edits",
        scene.len(),
        editor.history().len()
    );
    Ok((editor, scene))
}
