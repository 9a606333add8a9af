/// Pan/zoom/rotate editing session over the grid-to-pixel transform
use std::f64::consts::TAU;
use std::sync::{Arc, PoisonError, RwLock};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{GeometryError, Result};
use crate::geometry::{Point, Vector};
use crate::transform::{AffineTransform, Epsilon};

/// A single user edit intent. Pivots are in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edit {
    Pan { de: f64, df: f64 },
    Zoom { factor: f64, pivot: Point },
    Rotate { angle: f64, pivot: Point },
}

impl Edit {
    /// The pixel-space transform this edit left-multiplies onto the current one
    pub fn to_transform(self) -> Result<AffineTransform> {
        match self {
            Edit::Pan { de, df } => {
                if !de.is_finite() || !df.is_finite() {
                    return Err(GeometryError::NonFinite("pan offset"));
                }
                Ok(AffineTransform::translation(de, df))
            }
            Edit::Zoom { factor, pivot } => {
                if !(factor.is_finite() && factor > 0.0) {
                    return Err(GeometryError::InvalidZoomFactor(factor));
                }
                check_pivot(&pivot)?;
                Ok(AffineTransform::about(
                    &pivot,
                    &AffineTransform::scale(factor, factor),
                ))
            }
            Edit::Rotate { angle, pivot } => {
                if !angle.is_finite() {
                    return Err(GeometryError::NonFinite("rotation angle"));
                }
                check_pivot(&pivot)?;
                Ok(AffineTransform::about(
                    &pivot,
                    &AffineTransform::rotation(angle),
                ))
            }
        }
    }
}

fn check_pivot(pivot: &Point) -> Result<()> {
    if pivot.x.is_finite() && pivot.y.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonFinite("pivot"))
    }
}

/// Running totals of the edits applied so far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditTotals {
    /// Sum of all pan offsets, in pixels
    pub pan: Vector,
    /// Product of all zoom factors
    pub zoom: f64,
    /// Sum of all rotation angles, wrapped into `[0, 2π)`
    pub rotation: f64,
}

impl EditTotals {
    pub fn zero() -> Self {
        Self {
            pan: Vector::zeros(),
            zoom: 1.0,
            rotation: 0.0,
        }
    }

    fn record(&mut self, edit: &Edit) {
        match *edit {
            Edit::Pan { de, df } => self.pan += Vector::new(de, df),
            Edit::Zoom { factor, .. } => self.zoom *= factor,
            Edit::Rotate { angle, .. } => self.rotation = (self.rotation + angle).rem_euclid(TAU),
        }
    }
}

impl Default for EditTotals {
    fn default() -> Self {
        Self::zero()
    }
}

/// Editing session: the single writer of the current transform.
///
/// Every edit is composed in the current pixel frame, i.e. the edit's
/// transform is left-multiplied onto the current one, in arrival order.
#[derive(Debug, Clone)]
pub struct TransformEditor {
    initial: AffineTransform,
    current: AffineTransform,
    history: Vec<Edit>,
    totals: EditTotals,
}

impl TransformEditor {
    /// Start a session at the identity transform
    pub fn new() -> Self {
        Self::start(AffineTransform::identity())
    }

    /// Start a session at a caller-supplied transform, which must be invertible.
    pub fn with_transform(initial: AffineTransform) -> Result<Self> {
        if !initial.is_finite() {
            return Err(GeometryError::NonFinite("transform coefficient"));
        }
        initial.ensure_invertible(Epsilon::Auto)?;
        Ok(Self::start(initial))
    }

    fn start(initial: AffineTransform) -> Self {
        Self {
            initial,
            current: initial,
            history: Vec::new(),
            totals: EditTotals::zero(),
        }
    }

    pub fn current(&self) -> AffineTransform {
        self.current
    }

    pub fn initial(&self) -> AffineTransform {
        self.initial
    }

    /// Edits applied since the session started (or was reset), oldest first
    pub fn history(&self) -> &[Edit] {
        &self.history
    }

    pub fn totals(&self) -> EditTotals {
        self.totals
    }

    /// Apply one edit. On error the session is left untouched.
    ///
    /// Valid inputs can still overflow or underflow once composed, so the
    /// resulting transform must itself be finite and invertible.
    pub fn apply(&mut self, edit: Edit) -> Result<AffineTransform> {
        let step = edit.to_transform()?;
        let candidate = step.compose(&self.current);
        if !candidate.is_finite() {
            log::debug!("rejecting {:?}: result overflows", edit);
            return Err(GeometryError::NonFinite("transform coefficient"));
        }
        candidate.ensure_invertible(Epsilon::Auto)?;

        self.current = candidate;
        self.history.push(edit);
        self.totals.record(&edit);
        log::debug!("applied {:?}, transform now {:?}", edit, self.current.coefficients());
        Ok(self.current)
    }

    pub fn pan(&mut self, de: f64, df: f64) -> Result<AffineTransform> {
        self.apply(Edit::Pan { de, df })
    }

    pub fn zoom(&mut self, factor: f64, pivot: Point) -> Result<AffineTransform> {
        self.apply(Edit::Zoom { factor, pivot })
    }

    pub fn rotate(&mut self, angle: f64, pivot: Point) -> Result<AffineTransform> {
        self.apply(Edit::Rotate { angle, pivot })
    }

    /// Return to the initial transform and forget all edits
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.history.clear();
        self.totals = EditTotals::zero();
        log::debug!("editor reset to {:?}", self.initial.coefficients());
    }

    pub fn grid_to_pixel(&self, p: &Point) -> Point {
        self.current.apply_to_point(p)
    }

    pub fn pixel_to_grid(&self, p: &Point) -> Result<Point> {
        Ok(self.current.invert()?.apply_to_point(p))
    }
}

impl Default for TransformEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of applying a batch of queued edits
#[derive(Debug, Default)]
pub struct DrainReport {
    pub applied: usize,
    pub rejected: Vec<(Edit, GeometryError)>,
}

/// Multi-producer queue that serializes edits from several input sources.
///
/// Producers hold [`EditSender`]s; the session owner drains the queue into
/// its editor, which applies edits strictly in arrival order.
pub struct EditQueue {
    sender: Sender<Edit>,
    receiver: Receiver<Edit>,
}

/// Producer handle for an [`EditQueue`]
#[derive(Clone)]
pub struct EditSender {
    sender: Sender<Edit>,
}

impl EditSender {
    /// Queue an edit. Returns `false` once the queue has been dropped.
    pub fn submit(&self, edit: Edit) -> bool {
        self.sender.send(edit).is_ok()
    }
}

impl EditQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> EditSender {
        EditSender {
            sender: self.sender.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Apply every queued edit to `editor`. Rejected edits are reported, not dropped.
    pub fn drain_into(&self, editor: &mut TransformEditor) -> DrainReport {
        let mut report = DrainReport::default();
        for edit in self.receiver.try_iter() {
            match editor.apply(edit) {
                Ok(_) => report.applied += 1,
                Err(err) => {
                    log::warn!("rejected {:?}: {}", edit, err);
                    report.rejected.push((edit, err));
                }
            }
        }
        report
    }
}

impl Default for EditQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A session shared between one writer and any number of readers.
///
/// Readers take a [`snapshot`](SharedEditor::snapshot) of the current
/// transform; they always observe it either before or after an edit.
#[derive(Debug, Clone, Default)]
pub struct SharedEditor {
    inner: Arc<RwLock<TransformEditor>>,
}

impl SharedEditor {
    pub fn new(editor: TransformEditor) -> Self {
        Self {
            inner: Arc::new(RwLock::new(editor)),
        }
    }

    pub fn snapshot(&self) -> AffineTransform {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
    }

    pub fn apply(&self, edit: Edit) -> Result<AffineTransform> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(edit)
    }

    /// Drain `queue` under a single write lock
    pub fn apply_queued(&self, queue: &EditQueue) -> DrainReport {
        let mut editor = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        queue.drain_into(&mut editor)
    }

    /// Run `f` against a consistent view of the whole session
    pub fn read<R>(&self, f: impl FnOnce(&TransformEditor) -> R) -> R {
        f(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOL: f64 = 1e-9;

    fn skewed_editor() -> TransformEditor {
        TransformEditor::with_transform(AffineTransform::new(20.0, 5.0, 0.0, -10.0, 200.0, 300.0))
            .unwrap()
    }

    #[test]
    fn test_new_editor_is_identity() {
        let editor = TransformEditor::new();
        assert_eq!(editor.current(), AffineTransform::identity());
        assert!(editor.history().is_empty());
        assert_eq!(editor.totals(), EditTotals::zero());
    }

    #[test]
    fn test_degenerate_initial_rejected() {
        let singular = AffineTransform::new(2.0, 1.0, 4.0, 2.0, 0.0, 0.0);
        assert!(matches!(
            TransformEditor::with_transform(singular),
            Err(GeometryError::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn test_pans_accumulate_after_rotation() {
        let mut editor = skewed_editor();
        editor.rotate(0.7, Point::new(50.0, 50.0)).unwrap();
        editor.zoom(2.5, Point::new(10.0, 0.0)).unwrap();
        let before = editor.current().coefficients();

        editor.pan(3.0, -4.0).unwrap();
        editor.pan(1.0, 1.0).unwrap();
        let after = editor.current().coefficients();

        assert!((after[4] - before[4] - 4.0).abs() < TOL);
        assert!((after[5] - before[5] + 3.0).abs() < TOL);
        assert_eq!(&after[..4], &before[..4]);
        assert_eq!(editor.totals().pan, Vector::new(4.0, -3.0));
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let mut editor = skewed_editor();
        let pivot = Point::new(320.0, 180.0);
        let grid_under_pivot = editor.pixel_to_grid(&pivot).unwrap();

        editor.zoom(1.75, pivot).unwrap();
        let moved = editor.grid_to_pixel(&grid_under_pivot);
        assert!((moved - pivot).norm() < 1e-6);
    }

    #[test]
    fn test_rotate_keeps_pivot_fixed() {
        let mut editor = skewed_editor();
        let pivot = Point::new(-12.0, 44.0);
        let grid_under_pivot = editor.pixel_to_grid(&pivot).unwrap();

        editor.rotate(2.0 * PI / 3.0, pivot).unwrap();
        let moved = editor.grid_to_pixel(&grid_under_pivot);
        assert!((moved - pivot).norm() < 1e-6);
    }

    #[test]
    fn test_invalid_zoom_does_not_mutate() {
        let mut editor = skewed_editor();
        editor.pan(5.0, 5.0).unwrap();
        let before = editor.current();

        for factor in [0.0, -2.0, f64::NAN] {
            let result = editor.zoom(factor, Point::new(1.0, 1.0));
            assert!(matches!(result, Err(GeometryError::InvalidZoomFactor(_))));
        }
        assert_eq!(editor.current(), before);
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_overflowing_edits_do_not_mutate() {
        let mut editor = TransformEditor::new();
        let origin = Point::origin();

        // 1e200 squared overflows the determinant on the first zoom.
        assert!(editor.zoom(1e200, origin).is_err());
        editor.zoom(1e150, origin).unwrap();
        assert!(editor.zoom(1e200, origin).is_err());
        assert_eq!(editor.history().len(), 1);
        assert!(editor.current().is_finite());
        assert!(editor.pixel_to_grid(&Point::new(1.0, 1.0)).is_ok());

        let mut editor = TransformEditor::new();
        editor.pan(1.7e308, 0.0).unwrap();
        assert_eq!(
            editor.pan(1.7e308, 0.0),
            Err(GeometryError::NonFinite("transform coefficient"))
        );
        assert_eq!(editor.current(), AffineTransform::translation(1.7e308, 0.0));
        assert_eq!(editor.totals().pan, Vector::new(1.7e308, 0.0));
    }

    #[test]
    fn test_underflowing_zoom_stops_before_singular() {
        let mut editor = skewed_editor();
        let pivot = Point::new(200.0, 300.0);
        let mut accepted = 0;
        for _ in 0..20 {
            if editor.zoom(1e-20, pivot).is_ok() {
                accepted += 1;
            }
        }

        assert!(accepted < 20);
        assert_eq!(editor.history().len(), accepted);
        assert!(editor.current().invert().is_ok());
        assert!(editor.current().coefficients()[..4].iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_non_finite_pan_rejected() {
        let mut editor = TransformEditor::new();
        assert_eq!(
            editor.pan(f64::INFINITY, 0.0),
            Err(GeometryError::NonFinite("pan offset"))
        );
        assert!(editor.history().is_empty());
    }

    #[test]
    fn test_rotate_then_pan_differs_from_pan_then_rotate() {
        let origin = Point::origin();

        let mut a = TransformEditor::new();
        a.rotate(FRAC_PI_2, origin).unwrap();
        a.pan(10.0, 0.0).unwrap();

        let mut b = TransformEditor::new();
        b.pan(10.0, 0.0).unwrap();
        b.rotate(FRAC_PI_2, origin).unwrap();

        assert!(!a.current().approx_eq(&b.current(), TOL));
        let p = Point::new(1.0, 0.0);
        assert!((a.grid_to_pixel(&p) - Point::new(10.0, 1.0)).norm() < TOL);
        assert!((b.grid_to_pixel(&p) - Point::new(0.0, 11.0)).norm() < TOL);
    }

    #[test]
    fn test_rotation_total_wraps() {
        let mut editor = TransformEditor::new();
        for _ in 0..5 {
            editor.rotate(FRAC_PI_2, Point::origin()).unwrap();
        }
        assert!((editor.totals().rotation - FRAC_PI_2).abs() < TOL);
        editor.rotate(-PI, Point::origin()).unwrap();
        assert!((editor.totals().rotation - 3.0 * FRAC_PI_2).abs() < TOL);
    }

    #[test]
    fn test_reset() {
        let mut editor = skewed_editor();
        editor.zoom(3.0, Point::new(0.0, 0.0)).unwrap();
        editor.reset();
        assert_eq!(editor.current(), editor.initial());
        assert!(editor.history().is_empty());
        assert_eq!(editor.totals().zoom, 1.0);
    }

    #[test]
    fn test_queue_applies_in_arrival_order() {
        let queue = EditQueue::new();
        let keyboard = queue.sender();
        let mouse = queue.sender();

        assert!(keyboard.submit(Edit::Pan { de: 10.0, df: 0.0 }));
        assert!(mouse.submit(Edit::Rotate { angle: FRAC_PI_2, pivot: Point::origin() }));
        assert!(mouse.submit(Edit::Zoom { factor: 0.0, pivot: Point::origin() }));
        assert_eq!(queue.len(), 3);

        let mut editor = TransformEditor::new();
        let report = queue.drain_into(&mut editor);
        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(report.rejected[0].1, GeometryError::InvalidZoomFactor(_)));
        assert!(queue.is_empty());

        // Pan first, then rotate: (1, 0) -> (11, 0) -> (0, 11)
        let p = editor.grid_to_pixel(&Point::new(1.0, 0.0));
        assert!((p - Point::new(0.0, 11.0)).norm() < TOL);
    }

    #[test]
    fn test_shared_snapshot_is_a_copy() {
        let shared = SharedEditor::new(TransformEditor::new());
        let before = shared.snapshot();
        shared.apply(Edit::Pan { de: 1.0, df: 2.0 }).unwrap();
        assert_eq!(before, AffineTransform::identity());
        assert_eq!(shared.snapshot(), AffineTransform::translation(1.0, 2.0));
        assert_eq!(shared.read(|e| e.history().len()), 1);
    }

    #[test]
    fn test_shared_readers_see_whole_edits() {
        let shared = SharedEditor::default();
        let queue = EditQueue::new();
        let sender = queue.sender();
        for _ in 0..100 {
            sender.submit(Edit::Zoom { factor: 2.0, pivot: Point::new(3.0, 3.0) });
            sender.submit(Edit::Zoom { factor: 0.5, pivot: Point::new(3.0, 3.0) });
        }

        std::thread::scope(|scope| {
            let reader = shared.clone();
            scope.spawn(move || {
                for _ in 0..1000 {
                    let t = reader.snapshot();
                    let scale = t.coefficients()[0];
                    assert!((scale - 1.0).abs() < TOL || (scale - 2.0).abs() < TOL);
                }
            });
            let report = shared.apply_queued(&queue);
            assert_eq!(report.applied, 200);
        });

        assert!(shared.snapshot().approx_eq(&AffineTransform::identity(), TOL));
    }
}
