/// Terminal driver: keyboard/mouse edits in, shaded ASCII voxels out
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use isogrid_core::{
    load_scene, Edit, EditQueue, EditSender, HitTester, Point, Scene, SceneConfig, ScriptError,
    TransformEditor,
};
use std::f64::consts::PI;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Pan distance per key press, in character cells
const PAN_STEP: f64 = 2.0;
/// Zoom factor per key press or scroll notch
const ZOOM_STEP: f64 = 1.25;
/// Rotation per key press
const ROTATE_STEP: f64 = PI / 24.0;

/// Load a scene script, fitting the view to the grid the script covers.
///
/// The script runs once to find its extent and tallest cell, then again
/// against a config fitted to them, so its edits start from that view.
pub fn load_fitted_scene(
    source: &str,
    width: u16,
    height: u16,
) -> Result<(TransformEditor, Scene, SceneConfig), ScriptError> {
    let draft = SceneConfig::fitted(width as u32, height as u32, 1, 0.0);
    let (_, extent) = load_scene(source, &draft)?;

    let config = SceneConfig::fitted(
        width as u32,
        height as u32,
        extent.grid_extent(),
        extent.max_height(),
    );
    let (editor, scene) = load_scene(source, &config)?;
    Ok((editor, scene, config))
}

/// Main application struct for the terminal voxel viewer
pub struct TerminalApp {
    scene: Scene,
    config: SceneConfig,
    editor: TransformEditor,
    edits: EditQueue,
    input: EditSender,
    renderer: AsciiRenderer,
    mouse: Option<Point>,
    status: Option<String>,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(scene: Scene, editor: TransformEditor, config: SceneConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        let edits = EditQueue::new();
        let input = edits.sender();

        Ok(Self {
            scene,
            config,
            editor,
            edits,
            input,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            mouse: None,
            status: None,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            cursor::Hide,
            EnableMouseCapture
        )?;

        let result = self.main_loop();

        // Cleanup
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;
        terminal::disable_raw_mode()?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }

            // Update
            self.update();

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    /// Zoom and rotate about the mouse, or the screen centre before the mouse moves
    fn pivot(&self) -> io::Result<Point> {
        match self.mouse {
            Some(p) => Ok(p),
            None => {
                let (width, height) = terminal::size()?;
                Ok(Point::new(width as f64 / 2.0, height as f64 / 2.0))
            }
        }
    }

    fn handle_input(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(key) => self.handle_key(key)?,
            Event::Mouse(mouse) => self.handle_mouse(mouse)?,
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> io::Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let edit = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                None
            }
            KeyCode::Char('w') | KeyCode::Up => Some(Edit::Pan { de: 0.0, df: -PAN_STEP }),
            KeyCode::Char('s') | KeyCode::Down => Some(Edit::Pan { de: 0.0, df: PAN_STEP }),
            KeyCode::Char('a') | KeyCode::Left => Some(Edit::Pan { de: -PAN_STEP, df: 0.0 }),
            KeyCode::Char('d') | KeyCode::Right => Some(Edit::Pan { de: PAN_STEP, df: 0.0 }),
            KeyCode::Char('+') | KeyCode::Char('=') => Some(Edit::Zoom {
                factor: ZOOM_STEP,
                pivot: self.pivot()?,
            }),
            KeyCode::Char('-') => Some(Edit::Zoom {
                factor: 1.0 / ZOOM_STEP,
                pivot: self.pivot()?,
            }),
            KeyCode::Char('e') => Some(Edit::Rotate {
                angle: ROTATE_STEP,
                pivot: self.pivot()?,
            }),
            KeyCode::Char('r') => Some(Edit::Rotate {
                angle: -ROTATE_STEP,
                pivot: self.pivot()?,
            }),
            KeyCode::Char('0') => {
                self.editor.reset();
                self.status = None;
                None
            }
            _ => None,
        };

        if let Some(edit) = edit {
            self.input.submit(edit);
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> io::Result<()> {
        let position = Point::new(mouse.column as f64 + 0.5, mouse.row as f64 + 0.5);
        self.mouse = Some(position);

        match mouse.kind {
            MouseEventKind::ScrollUp => {
                self.input.submit(Edit::Zoom { factor: ZOOM_STEP, pivot: position });
            }
            MouseEventKind::ScrollDown => {
                self.input.submit(Edit::Zoom { factor: 1.0 / ZOOM_STEP, pivot: position });
            }
            _ => {}
        }
        Ok(())
    }

    fn update(&mut self) {
        let report = self.edits.drain_into(&mut self.editor);
        if let Some((_, err)) = report.rejected.last() {
            self.status = Some(err.to_string());
        }
    }

    /// First and second HUD lines
    fn hud(&self) -> (String, String) {
        let title = format!(
            "Isogrid | FPS: {:.1} | WASD/Arrows=Pan +/-/Scroll=Zoom E/R=Rotate 0=Reset Q=Quit",
            self.fps
        );

        let mouse = match self.mouse {
            None => "Mouse: -".to_string(),
            Some(pixel) => match HitTester::new(&self.editor.current(), self.config.epsilon) {
                Ok(tester) => {
                    let grid = tester.with_precision(0).locate(&pixel);
                    let cell = tester.cell_at(&self.config.grid(), &pixel);
                    format!(
                        "Mouse: ({:.0}, {:.0}) | Mouse (grid): ({}, {}) | Cell: {:?}",
                        pixel.x.floor(),
                        pixel.y.floor(),
                        grid.x,
                        grid.y,
                        cell
                    )
                }
                Err(err) => format!("Mouse: {}", err),
            },
        };

        let second = match &self.status {
            Some(status) => format!("{} | {}", mouse, status),
            None => mouse,
        };
        (title, second)
    }

    fn render(&mut self) -> io::Result<()> {
        let transform = self.editor.current();

        // Clear renderer
        self.renderer.clear();

        // Ground grid, then voxels far to near
        self.renderer
            .render_lines(&self.config.grid().pixel_lines(&transform));
        let voxels = self
            .config
            .projector(transform)
            .and_then(|projector| self.scene.project(&projector));
        match voxels {
            Ok(voxels) => self.renderer.render_voxels(&voxels),
            Err(err) => {
                log::error!("projection failed: {}", err);
                self.status = Some(err.to_string());
            }
        }

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let (title, mouse) = self.hud();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(title),
            cursor::MoveTo(0, 1),
            Print(mouse),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
