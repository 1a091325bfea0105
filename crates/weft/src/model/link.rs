use std::{
    fmt,
    ops::Range,
    ptr,
    rc::{Rc, Weak},
};

use log::{debug, warn};

use weft_core::{
    entity::{BaseEntity, Entity, EntityKind, EntityOptions},
    geometry::Coords,
    identifier::Id,
    path::{curve_path, line_path},
    state::{Subscription, ValueState},
};

use super::{
    BaseModel, Extras, LabelModel, Model, ModelRef, PointModel, PointOptions, PortModel, same_rc,
    same_rcs,
};
use crate::{
    clone::{CloneLookup, DeepClone},
    diagram::DiagramModel,
    error::{ModelError, ensure_unlocked},
};

/// The two anchored ends of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    /// Anchors the first point.
    Source,
    /// Anchors the last point.
    Target,
}

impl LinkEnd {
    pub fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

/// How [`LinkModel::refresh_path`] shapes the path hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathStyle {
    Line,
    /// Cubic curve whose control points are pushed `curvy` units along the
    /// dominant axis.
    Curve { curvy: f32 },
}

/// Construction options of a [`LinkModel`].
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    entity: EntityOptions,
    points: Vec<PointOptions>,
    source_port: Option<Rc<PortModel>>,
    target_port: Option<Rc<PortModel>>,
    label: Option<Rc<LabelModel>>,
    extras: Extras,
    parent: Weak<DiagramModel>,
}

impl LinkOptions {
    pub fn with_entity(mut self, entity: EntityOptions) -> Self {
        self.entity = entity;
        self
    }

    /// Appends a point. Links are padded with default points to at least
    /// two.
    pub fn with_point(mut self, point: PointOptions) -> Self {
        self.points.push(point);
        self
    }

    pub fn with_source_port(mut self, port: Rc<PortModel>) -> Self {
        self.source_port = Some(port);
        self
    }

    pub fn with_target_port(mut self, port: Rc<PortModel>) -> Self {
        self.target_port = Some(port);
        self
    }

    pub fn with_label(mut self, label: Rc<LabelModel>) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }

    pub fn with_parent(mut self, diagram: &Rc<DiagramModel>) -> Self {
        self.parent = Rc::downgrade(diagram);
        self
    }
}

/// An edge between two ports.
///
/// A link always has at least two points. The first point is the source
/// endpoint and the last point the target endpoint; setting a port
/// registers the link with that port and deregisters it from the port
/// previously held at the same end.
pub struct LinkModel {
    this: Weak<Self>,
    model: BaseModel<DiagramModel>,
    source_port: ValueState<Option<Rc<PortModel>>>,
    target_port: ValueState<Option<Rc<PortModel>>>,
    points: ValueState<Vec<Rc<PointModel>>>,
    label: ValueState<Option<Rc<LabelModel>>>,
    extras: ValueState<Extras>,
    path: ValueState<Option<String>>,
}

impl LinkModel {
    pub fn new(options: LinkOptions) -> Rc<Self> {
        let LinkOptions {
            entity,
            points,
            source_port,
            target_port,
            label,
            extras,
            parent,
        } = options;

        let link = Rc::new_cyclic(|this: &Weak<Self>| {
            let model = BaseModel::new(EntityKind::Link, &entity, parent);
            let mut points: Vec<_> = points
                .into_iter()
                .map(|point| PointModel::with_parent(point, this.clone()))
                .collect();
            while points.len() < 2 {
                points.push(PointModel::with_parent(PointOptions::default(), this.clone()));
            }

            Self {
                this: this.clone(),
                source_port: ValueState::with_eq(None, &model.pipe("source_port"), same_rc),
                target_port: ValueState::with_eq(None, &model.pipe("target_port"), same_rc),
                points: ValueState::with_eq(points, &model.pipe("points"), same_rcs),
                label: ValueState::with_eq(None, &model.pipe("label"), same_rc),
                extras: ValueState::new(extras, &model.pipe("extras")),
                path: ValueState::new(None, &model.pipe("path")),
                model,
            }
        });

        if let Some(label) = label {
            link.attach_label(label);
        }
        if source_port.is_some() {
            link.replace_port(LinkEnd::Source, source_port);
        }
        if target_port.is_some() {
            link.replace_port(LinkEnd::Target, target_port);
        }
        if link.is_locked() {
            link.set_locked(true);
        }

        debug!(id:% = link.id(); "Link created");
        link
    }

    pub(crate) fn downgrade(&self) -> Weak<Self> {
        self.this.clone()
    }

    // ==== Ports ====

    pub fn source_port(&self) -> Option<Rc<PortModel>> {
        self.source_port.get()
    }

    pub fn target_port(&self) -> Option<Rc<PortModel>> {
        self.target_port.get()
    }

    pub fn port(&self, end: LinkEnd) -> Option<Rc<PortModel>> {
        self.port_state(end).get()
    }

    /// Anchors the source end at `port`, or releases it with `None`.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the link is locked.
    /// - [`ModelError::PortFull`] if `port` has no room for another link.
    pub fn set_source_port(&self, port: Option<Rc<PortModel>>) -> Result<(), ModelError> {
        self.set_port(LinkEnd::Source, port)
    }

    /// Anchors the target end at `port`, or releases it with `None`.
    ///
    /// # Errors
    ///
    /// Same as [`LinkModel::set_source_port`].
    pub fn set_target_port(&self, port: Option<Rc<PortModel>>) -> Result<(), ModelError> {
        self.set_port(LinkEnd::Target, port)
    }

    pub fn set_port(&self, end: LinkEnd, port: Option<Rc<PortModel>>) -> Result<(), ModelError> {
        ensure_unlocked(self, "change port")?;
        if let Some(port) = &port {
            if port.is_full() && !port.has_link(self.id()) {
                warn!(link:% = self.id(), port:% = port.id(); "Port is full, refusing link");
                return Err(ModelError::PortFull {
                    port: port.id(),
                    max: port.max_links().unwrap_or_default(),
                });
            }
        }

        self.replace_port(end, port);
        Ok(())
    }

    pub fn select_source_port(
        &self,
        next: impl FnMut(&Option<Rc<PortModel>>) + 'static,
    ) -> Subscription {
        self.source_port.subscribe(next)
    }

    pub fn select_target_port(
        &self,
        next: impl FnMut(&Option<Rc<PortModel>>) + 'static,
    ) -> Subscription {
        self.target_port.subscribe(next)
    }

    fn port_state(&self, end: LinkEnd) -> &ValueState<Option<Rc<PortModel>>> {
        match end {
            LinkEnd::Source => &self.source_port,
            LinkEnd::Target => &self.target_port,
        }
    }

    fn holds(&self, end: LinkEnd, port: &PortModel) -> bool {
        self.port_state(end)
            .with(|held| held.as_ref().is_some_and(|held| ptr::eq(held.as_ref(), port)))
    }

    /// Stores `port` at `end` without policy checks.
    ///
    /// The link joins the new port before it leaves the old one, so it is
    /// never absent from both. The old port keeps the link if the other end
    /// still holds it.
    fn replace_port(&self, end: LinkEnd, port: Option<Rc<PortModel>>) {
        let previous = self.port(end);
        if same_rc(&previous, &port) {
            return;
        }

        if let Some(port) = &port {
            port.add_link(self);
        }
        if let Some(previous) = &previous {
            if !self.holds(end.opposite(), previous) {
                previous.remove_link(self.id());
            }
        }

        debug!(
            link:% = self.id(),
            end:? = end,
            port:? = port.as_ref().map(|port| port.id());
            "Link port changed"
        );
        self.port_state(end).set(port);
    }

    /// Releases every end anchored at `port`.
    pub(crate) fn detach_port(&self, port: &PortModel) {
        for end in [LinkEnd::Source, LinkEnd::Target] {
            if self.holds(end, port) {
                self.replace_port(end, None);
            }
        }
    }

    /// The endpoint anchored at `port`: the first point for the source
    /// port, the last point for the target port. A loop resolves to the
    /// first point; see [`LinkModel::endpoints_for_port`].
    pub fn point_for_port(&self, port: &PortModel) -> Option<Rc<PointModel>> {
        if self.holds(LinkEnd::Source, port) {
            return Some(self.first_point());
        }
        if self.holds(LinkEnd::Target, port) {
            return Some(self.last_point());
        }
        None
    }

    /// Every endpoint anchored at `port`. A link looping from a port back to
    /// itself yields both its first and last points.
    pub fn endpoints_for_port(&self, port: &PortModel) -> Vec<Rc<PointModel>> {
        let mut points = Vec::new();
        if self.holds(LinkEnd::Source, port) {
            points.push(self.first_point());
        }
        if self.holds(LinkEnd::Target, port) {
            points.push(self.last_point());
        }
        points
    }

    /// The port anchoring `point`. Interior points never map to a port.
    pub fn port_for_point(&self, point: &PointModel) -> Option<Rc<PortModel>> {
        if let Some(source) = self.source_port() {
            if ptr::eq(self.first_point().as_ref(), point) {
                return Some(source);
            }
        }
        if let Some(target) = self.target_port() {
            if ptr::eq(self.last_point().as_ref(), point) {
                return Some(target);
            }
        }
        None
    }

    // ==== Points ====

    pub fn points(&self) -> Vec<Rc<PointModel>> {
        self.points.get()
    }

    pub fn point_count(&self) -> usize {
        self.points.with(Vec::len)
    }

    pub fn first_point(&self) -> Rc<PointModel> {
        self.points.with(|points| Rc::clone(&points[0]))
    }

    pub fn last_point(&self) -> Rc<PointModel> {
        self.points
            .with(|points| Rc::clone(&points[points.len() - 1]))
    }

    /// Position of `point` in the sequence, by identity.
    pub fn point_index(&self, point: &PointModel) -> Option<usize> {
        self.points
            .with(|points| points.iter().position(|p| ptr::eq(p.as_ref(), point)))
    }

    pub fn is_last_point(&self, point: &PointModel) -> bool {
        self.point_index(point) == Some(self.point_count() - 1)
    }

    pub fn point(&self, id: Id) -> Option<Rc<PointModel>> {
        self.points
            .with(|points| points.iter().find(|point| point.id() == id).cloned())
    }

    pub fn select_points(&self, mut next: impl FnMut(&[Rc<PointModel>]) + 'static) -> Subscription {
        self.points.subscribe(move |points: &Vec<Rc<PointModel>>| next(points.as_slice()))
    }

    /// Creates a point owned by this link without inserting it.
    pub fn generate_point(&self, coords: Coords) -> Rc<PointModel> {
        PointModel::with_parent(PointOptions::default().with_coords(coords), self.downgrade())
    }

    /// Inserts `point` at `index`, clamped to the end of the sequence.
    ///
    /// The point is reparented to this link and takes its lock state.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the link is locked.
    /// - [`ModelError::InvalidReference`] if `point` is already a member or
    ///   still belongs to another link.
    pub fn add_point(&self, point: Rc<PointModel>, index: usize) -> Result<Rc<PointModel>, ModelError> {
        ensure_unlocked(self, "add point")?;
        if self.point_index(&point).is_some() {
            warn!(link:% = self.id(), point:% = point.id(); "Point already on link");
            return Err(ModelError::InvalidReference {
                id: point.id(),
                reason: format!("point is already on link `{}`", self.id()),
            });
        }
        self.ensure_point_free(&point)?;

        self.adopt_point(&point);
        let mut points = self.points();
        let index = index.min(points.len());
        points.insert(index, Rc::clone(&point));
        self.points.set(points);

        debug!(link:% = self.id(), point:% = point.id(), index = index; "Point added");
        Ok(point)
    }

    /// Inserts `point` right after the first point.
    pub fn add_middle_point(&self, point: Rc<PointModel>) -> Result<Rc<PointModel>, ModelError> {
        self.add_point(point, 1)
    }

    /// Generates a point at `coords` and inserts it after the first point.
    pub fn point_at(&self, coords: Coords) -> Result<Rc<PointModel>, ModelError> {
        self.add_middle_point(self.generate_point(coords))
    }

    /// Replaces the whole sequence. Points that are dropped are destroyed.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the link is locked.
    /// - [`ModelError::TooFewPoints`] if `points` has fewer than two entries.
    /// - [`ModelError::InvalidReference`] if a point appears twice or still
    ///   belongs to another link.
    pub fn set_points(&self, points: Vec<Rc<PointModel>>) -> Result<(), ModelError> {
        ensure_unlocked(self, "set points")?;
        if points.len() < 2 {
            return Err(self.too_few_points());
        }
        for (index, point) in points.iter().enumerate() {
            if points[..index].iter().any(|seen| Rc::ptr_eq(seen, point)) {
                warn!(link:% = self.id(), point:% = point.id(); "Point listed twice");
                return Err(ModelError::InvalidReference {
                    id: point.id(),
                    reason: "point appears more than once".to_string(),
                });
            }
            self.ensure_point_free(point)?;
        }
        self.replace_points(points);
        Ok(())
    }

    /// Removes and destroys `point`.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Locked`] if the link is locked.
    /// - [`ModelError::NotFound`] if `point` is not on this link.
    /// - [`ModelError::TooFewPoints`] if only two points remain.
    pub fn remove_point(&self, point: &PointModel) -> Result<(), ModelError> {
        ensure_unlocked(self, "remove point")?;
        let index = self.require_index(point)?;
        self.drain_points(index..index + 1).map(|_| ())
    }

    /// Removes and destroys every point before `point`. Returns how many
    /// points were removed.
    pub fn remove_points_before(&self, point: &PointModel) -> Result<usize, ModelError> {
        ensure_unlocked(self, "remove points")?;
        let index = self.require_index(point)?;
        self.drain_points(0..index)
    }

    /// Removes and destroys every point after `point`. Returns how many
    /// points were removed.
    pub fn remove_points_after(&self, point: &PointModel) -> Result<usize, ModelError> {
        ensure_unlocked(self, "remove points")?;
        let index = self.require_index(point)?;
        self.drain_points(index + 1..self.point_count())
    }

    /// Collapses the sequence to its first and last points.
    pub fn remove_middle_points(&self) -> Result<usize, ModelError> {
        ensure_unlocked(self, "remove points")?;
        let count = self.point_count();
        if count <= 2 {
            return Ok(0);
        }
        self.drain_points(1..count - 1)
    }

    fn require_index(&self, point: &PointModel) -> Result<usize, ModelError> {
        self.point_index(point)
            .ok_or_else(|| ModelError::not_found(EntityKind::Point, point.id()))
    }

    fn drain_points(&self, range: Range<usize>) -> Result<usize, ModelError> {
        let mut points = self.points();
        if points.len() - range.len() < 2 {
            return Err(self.too_few_points());
        }

        let removed: Vec<_> = points.drain(range).collect();
        if removed.is_empty() {
            return Ok(0);
        }
        self.points.set(points);
        for point in &removed {
            point.destroy();
        }

        debug!(link:% = self.id(), removed = removed.len(); "Points removed");
        Ok(removed.len())
    }

    fn too_few_points(&self) -> ModelError {
        warn!(link:% = self.id(); "Refusing to leave fewer than two points");
        ModelError::TooFewPoints { link: self.id() }
    }

    /// Fails if another link still holds `point` in its sequence.
    fn ensure_point_free(&self, point: &PointModel) -> Result<(), ModelError> {
        if let Some(owner) = point.parent() {
            if !ptr::eq(owner.as_ref(), self) && owner.point_index(point).is_some() {
                warn!(link:% = self.id(), point:% = point.id(), owner:% = owner.id(); "Point owned by another link");
                return Err(ModelError::InvalidReference {
                    id: point.id(),
                    reason: format!("point belongs to link `{}`", owner.id()),
                });
            }
        }
        Ok(())
    }

    fn adopt_point(&self, point: &PointModel) {
        point.model().set_parent_weak(self.downgrade());
        point.set_locked(self.is_locked());
    }

    fn replace_points(&self, points: Vec<Rc<PointModel>>) {
        for point in &points {
            self.adopt_point(point);
        }
        let previous = self.points();
        self.points.set(points);

        for point in previous {
            if self.point_index(&point).is_none() {
                point.destroy();
            }
        }
    }

    // ==== Label ====

    pub fn label(&self) -> Option<Rc<LabelModel>> {
        self.label.get()
    }

    /// Attaches `label`, destroying the label it replaces.
    pub fn set_label(&self, label: Rc<LabelModel>) {
        self.attach_label(label);
    }

    /// Destroys and clears the current label.
    pub fn reset_label(&self) {
        if let Some(label) = self.label() {
            self.label.set(None);
            label.destroy();
        }
    }

    pub fn select_label(&self, next: impl FnMut(&Option<Rc<LabelModel>>) + 'static) -> Subscription {
        self.label.subscribe(next)
    }

    fn attach_label(&self, label: Rc<LabelModel>) {
        label.model().set_parent_weak(self.downgrade());
        label.set_locked(self.is_locked());

        let previous = self.label();
        self.label.set(Some(Rc::clone(&label)));
        if let Some(previous) = previous {
            if !Rc::ptr_eq(&previous, &label) {
                previous.destroy();
            }
        }
    }

    // ==== Path and extras ====

    pub fn path(&self) -> Option<String> {
        self.path.get()
    }

    pub fn set_path(&self, path: impl Into<String>) {
        self.path.set(Some(path.into()));
    }

    pub fn select_path(&self, next: impl FnMut(&Option<String>) + 'static) -> Subscription {
        self.path.subscribe(next)
    }

    /// Recomputes the path hint from the first and last points.
    pub fn refresh_path(&self, style: PathStyle) -> String {
        let (from, to) = (self.first_point().coords(), self.last_point().coords());
        let path = match style {
            PathStyle::Line => line_path(from, to),
            PathStyle::Curve { curvy } => curve_path(from, to, curvy),
        };
        self.path.set(Some(path.clone()));
        path
    }

    pub fn extras(&self) -> Extras {
        self.extras.get()
    }

    pub fn set_extras(&self, extras: Extras) {
        self.extras.set(extras);
    }

    /// Subscribes to a projection of the extras; repeats are suppressed.
    pub fn select_extras<R, P, F>(&self, project: P, next: F) -> Subscription
    where
        R: PartialEq + 'static,
        P: Fn(&Extras) -> R + 'static,
        F: FnMut(&R) + 'static,
    {
        self.extras.select(project, next)
    }
}

impl Entity for LinkModel {
    fn base(&self) -> &BaseEntity {
        self.model.entity()
    }

    /// Locks or unlocks the link together with its points and label.
    fn set_locked(&self, locked: bool) {
        self.model.entity().set_locked(locked);
        for point in self.points() {
            point.set_locked(locked);
        }
        if let Some(label) = self.label() {
            label.set_locked(locked);
        }
    }

    /// Destroys the label, releases both ports, destroys the points, then
    /// tears the link down.
    fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }

        self.reset_label();
        self.replace_port(LinkEnd::Source, None);
        self.replace_port(LinkEnd::Target, None);
        for point in self.points() {
            point.destroy();
        }
        self.model.destroy();
    }
}

impl Model for LinkModel {
    type Parent = DiagramModel;

    fn model(&self) -> &BaseModel<DiagramModel> {
        &self.model
    }

    fn handle(&self) -> Option<ModelRef> {
        self.this.upgrade().map(ModelRef::Link)
    }
}

impl DeepClone for LinkModel {
    fn create_clone(&self) -> Rc<Self> {
        let options = LinkOptions {
            entity: EntityOptions::default().with_namespace(self.namespace()),
            extras: self.extras(),
            parent: self.model.parent_weak(),
            ..LinkOptions::default()
        };
        let clone = Self::new(options);
        clone.path.set(self.path());
        clone
    }

    /// Clones the points in order, the label, and both ports; the ports go
    /// through `lookup` so a port reached again resolves to the same clone.
    fn do_clone(&self, lookup: &mut CloneLookup, clone: &Rc<Self>) {
        let points = self
            .points()
            .iter()
            .map(|point| point.clone_with(lookup))
            .collect();
        clone.replace_points(points);

        if let Some(label) = self.label() {
            clone.attach_label(label.clone_with(lookup));
        }

        for end in [LinkEnd::Source, LinkEnd::Target] {
            if let Some(port) = self.port(end) {
                let port = port.clone_with(lookup);
                clone.replace_port(end, Some(port));
            }
        }
    }
}

impl fmt::Debug for LinkModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkModel")
            .field("id", &self.id())
            .field("source", &self.source_port().map(|port| port.id()))
            .field("target", &self.target_port().map(|port| port.id()))
            .field("points", &self.point_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::model::{LabelOptions, PortOptions};

    fn port() -> Rc<PortModel> {
        PortModel::new(PortOptions::default())
    }

    fn link_with_points(coords: &[(f32, f32)]) -> Rc<LinkModel> {
        let options = coords.iter().fold(LinkOptions::default(), |options, &(x, y)| {
            options.with_point(PointOptions::default().with_coords(Coords::new(x, y)))
        });
        LinkModel::new(options)
    }

    fn xs(link: &LinkModel) -> Vec<f32> {
        link.points().iter().map(|point| point.coords().x()).collect()
    }

    #[test]
    fn test_new_link_has_two_points() {
        let link = LinkModel::new(LinkOptions::default());

        assert_eq!(link.point_count(), 2);
        assert!(!Rc::ptr_eq(&link.first_point(), &link.last_point()));
        assert!(
            link.first_point()
                .parent()
                .is_some_and(|parent| Rc::ptr_eq(&parent, &link))
        );
    }

    #[test]
    fn test_single_point_option_is_padded() {
        let link = link_with_points(&[(5.0, 5.0)]);

        assert_eq!(xs(&link), vec![5.0, 0.0]);
    }

    #[test]
    fn test_constructor_ports_are_registered() {
        let (source, target) = (port(), port());
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(Rc::clone(&source))
                .with_target_port(Rc::clone(&target)),
        );

        assert!(source.has_link(link.id()));
        assert!(target.has_link(link.id()));
    }

    #[test]
    fn test_reassigning_source_moves_registration() {
        let (a, b) = (port(), port());
        let link = LinkModel::new(LinkOptions::default());

        link.set_source_port(Some(Rc::clone(&a))).unwrap();
        link.set_source_port(Some(Rc::clone(&b))).unwrap();
        link.set_source_port(Some(Rc::clone(&b))).unwrap();

        assert!(!a.has_link(link.id()));
        assert_eq!(b.links().len(), 1);
        assert!(link.source_port().is_some_and(|source| Rc::ptr_eq(&source, &b)));
    }

    #[test]
    fn test_port_kept_while_other_end_holds_it() {
        let (a, b) = (port(), port());
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(Rc::clone(&a))
                .with_target_port(Rc::clone(&a)),
        );

        link.set_target_port(Some(Rc::clone(&b))).unwrap();
        assert!(a.has_link(link.id()));

        link.set_source_port(None).unwrap();
        assert!(!a.has_link(link.id()));
        assert!(b.has_link(link.id()));
    }

    #[test]
    fn test_full_port_refuses_link() {
        let full = PortModel::new(PortOptions::default().with_max_links(1));
        let first = LinkModel::new(LinkOptions::default());
        let second = LinkModel::new(LinkOptions::default());
        first.set_target_port(Some(Rc::clone(&full))).unwrap();

        let err = second.set_source_port(Some(Rc::clone(&full))).unwrap_err();

        assert_eq!(
            err,
            ModelError::PortFull {
                port: full.id(),
                max: 1
            }
        );
        assert!(second.source_port().is_none());
        assert_eq!(full.link_count(), 1);
        // Re-setting the port that already holds the link is allowed.
        first.set_target_port(Some(Rc::clone(&full))).unwrap();
    }

    #[test]
    fn test_point_port_mapping() {
        let (source, target) = (port(), port());
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(Rc::clone(&source))
                .with_target_port(Rc::clone(&target)),
        );
        let middle = link.point_at(Coords::new(1.0, 1.0)).unwrap();

        let first = link.point_for_port(&source).unwrap();
        let last = link.point_for_port(&target).unwrap();
        assert!(Rc::ptr_eq(&first, &link.first_point()));
        assert!(Rc::ptr_eq(&last, &link.last_point()));
        assert!(link.port_for_point(&first).is_some_and(|p| Rc::ptr_eq(&p, &source)));
        assert!(link.port_for_point(&last).is_some_and(|p| Rc::ptr_eq(&p, &target)));
        assert!(link.port_for_point(&middle).is_none());
        assert!(link.point_for_port(&port()).is_none());
    }

    #[test]
    fn test_add_point_defaults_after_first() {
        let link = link_with_points(&[(0.0, 0.0), (9.0, 0.0)]);

        link.point_at(Coords::new(3.0, 0.0)).unwrap();
        link.point_at(Coords::new(1.0, 0.0)).unwrap();
        link.add_point(link.generate_point(Coords::new(20.0, 0.0)), 99).unwrap();

        assert_eq!(xs(&link), vec![0.0, 1.0, 3.0, 9.0, 20.0]);
        assert!(link.is_last_point(&link.last_point()));
    }

    #[test]
    fn test_add_point_propagates_lock_and_parent() {
        let link = LinkModel::new(LinkOptions::default());
        let point = PointModel::new(PointOptions::default());
        point.set_locked(true);

        link.add_middle_point(Rc::clone(&point)).unwrap();

        assert!(!point.is_locked());
        assert!(point.parent().is_some_and(|parent| Rc::ptr_eq(&parent, &link)));
        assert!(matches!(
            link.add_middle_point(point),
            Err(ModelError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_remove_point_by_identity() {
        let link = link_with_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let middle = link.points()[1].clone();
        let lookalike = PointModel::new(PointOptions::default().with_coords(middle.coords()));

        assert!(matches!(
            link.remove_point(&lookalike),
            Err(ModelError::NotFound { .. })
        ));
        link.remove_point(&middle).unwrap();

        assert_eq!(xs(&link), vec![0.0, 2.0]);
        assert!(middle.is_destroyed());
    }

    #[test]
    fn test_removal_refuses_to_leave_one_point() {
        let link = link_with_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let last = link.last_point();

        let err = link.remove_points_before(&last).unwrap_err();

        assert_eq!(err, ModelError::TooFewPoints { link: link.id() });
        assert_eq!(link.point_count(), 3);
        assert!(link.remove_point(&link.first_point()).is_ok());
        assert!(link.remove_point(&link.first_point()).is_err());
    }

    #[test]
    fn test_remove_points_before_and_after() {
        let link = link_with_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let second = link.points()[1].clone();
        let fourth = link.points()[3].clone();

        assert_eq!(link.remove_points_before(&second).unwrap(), 1);
        assert_eq!(link.remove_points_after(&fourth).unwrap(), 1);

        assert_eq!(xs(&link), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_remove_middle_points_keeps_endpoints() {
        let link = link_with_points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let (first, last) = (link.first_point(), link.last_point());

        assert_eq!(link.remove_middle_points().unwrap(), 2);
        assert_eq!(link.remove_middle_points().unwrap(), 0);

        assert!(Rc::ptr_eq(&link.first_point(), &first));
        assert!(Rc::ptr_eq(&link.last_point(), &last));
        assert_eq!(link.point_count(), 2);
    }

    #[test]
    fn test_set_points_requires_two() {
        let link = LinkModel::new(LinkOptions::default());
        let old = link.points();
        let single = vec![PointModel::new(PointOptions::default())];

        assert!(matches!(link.set_points(single), Err(ModelError::TooFewPoints { .. })));

        let fresh = vec![
            PointModel::new(PointOptions::default()),
            PointModel::new(PointOptions::default()),
            PointModel::new(PointOptions::default()),
        ];
        link.set_points(fresh).unwrap();
        assert_eq!(link.point_count(), 3);
        assert!(old.iter().all(|point| point.is_destroyed()));
    }

    #[test]
    fn test_set_points_rejects_shared_points() {
        let link = LinkModel::new(LinkOptions::default());
        let other = LinkModel::new(LinkOptions::default());
        let current = link.points();
        let point = PointModel::new(PointOptions::default());

        let repeated = vec![Rc::clone(&point), Rc::clone(&point)];
        assert!(matches!(
            link.set_points(repeated),
            Err(ModelError::InvalidReference { .. })
        ));

        let borrowed = vec![Rc::clone(&point), other.first_point()];
        assert!(matches!(
            link.set_points(borrowed),
            Err(ModelError::InvalidReference { .. })
        ));
        assert!(matches!(
            link.add_middle_point(other.last_point()),
            Err(ModelError::InvalidReference { .. })
        ));

        assert_eq!(link.point_count(), 2);
        assert!(Rc::ptr_eq(&link.first_point(), &current[0]));
        assert!(other.first_point().parent().is_some_and(|parent| Rc::ptr_eq(&parent, &other)));

        link.set_points(vec![Rc::clone(&current[1]), Rc::clone(&current[0])]).unwrap();
        assert!(Rc::ptr_eq(&link.first_point(), &current[1]));
    }

    #[test]
    fn test_loop_link_has_both_endpoints_on_its_port() {
        let looped = port();
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(Rc::clone(&looped))
                .with_target_port(Rc::clone(&looped)),
        );

        let endpoints = link.endpoints_for_port(&looped);

        assert_eq!(endpoints.len(), 2);
        assert!(Rc::ptr_eq(&endpoints[0], &link.first_point()));
        assert!(Rc::ptr_eq(&endpoints[1], &link.last_point()));
        assert!(link.endpoints_for_port(&port()).is_empty());
    }

    #[test]
    fn test_locked_link_refuses_structural_changes() {
        let link = LinkModel::new(LinkOptions::default());
        link.set_locked(true);

        assert!(link.first_point().is_locked());
        assert!(matches!(
            link.point_at(Coords::default()),
            Err(ModelError::Locked { .. })
        ));
        assert!(matches!(
            link.set_source_port(Some(port())),
            Err(ModelError::Locked { .. })
        ));
        assert!(link.remove_middle_points().is_err());

        // Value setters still apply.
        link.set_path("M 0 0");
        assert_eq!(link.path().as_deref(), Some("M 0 0"));

        link.set_locked(false);
        assert!(link.point_at(Coords::default()).is_ok());
    }

    #[test]
    fn test_set_label_destroys_previous() {
        let link = LinkModel::new(LinkOptions::default());
        let first = LabelModel::new(LabelOptions::default().with_text("a"));
        let second = LabelModel::new(LabelOptions::default().with_text("b"));

        link.set_label(Rc::clone(&first));
        link.set_label(Rc::clone(&second));

        assert!(first.is_destroyed());
        assert!(!second.is_destroyed());
        assert!(second.parent().is_some_and(|parent| Rc::ptr_eq(&parent, &link)));

        link.reset_label();
        assert!(link.label().is_none());
        assert!(second.is_destroyed());
    }

    #[test]
    fn test_select_points_tracks_changes() {
        let link = LinkModel::new(LinkOptions::default());
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        let _subscription = link.select_points(move |points| sink.borrow_mut().push(points.len()));

        let point = link.point_at(Coords::default()).unwrap();
        link.remove_point(&point).unwrap();

        assert_eq!(*counts.borrow(), vec![2, 3, 2]);
    }

    #[test]
    fn test_refresh_path() {
        let link = link_with_points(&[(0.0, 0.0), (50.0, 10.0)]);

        let line = link.refresh_path(PathStyle::Line);
        assert!(line.contains('L'));
        assert_eq!(link.path(), Some(line));

        let curve = link.refresh_path(PathStyle::Curve { curvy: 20.0 });
        assert!(curve.contains('C'));
    }

    #[test]
    fn test_destroy_cascades() {
        let (source, target) = (port(), port());
        let label = LabelModel::new(LabelOptions::default());
        let link = LinkModel::new(
            LinkOptions::default()
                .with_source_port(Rc::clone(&source))
                .with_target_port(Rc::clone(&target))
                .with_label(Rc::clone(&label)),
        );
        let points = link.points();
        let subscription = link.select_points(|_| {});

        link.destroy();

        assert!(link.is_destroyed());
        assert!(label.is_destroyed());
        assert!(points.iter().all(|point| point.is_destroyed()));
        assert_eq!(source.link_count(), 0);
        assert_eq!(target.link_count(), 0);
        assert!(!subscription.is_active());
    }

    #[test]
    fn test_deep_clone_standalone_link() {
        let (source, target) = (port(), port());
        let link = LinkModel::new(
            LinkOptions::default()
                .with_point(PointOptions::default().with_coords(Coords::new(1.0, 2.0)))
                .with_point(PointOptions::default().with_coords(Coords::new(3.0, 4.0)))
                .with_source_port(Rc::clone(&source))
                .with_target_port(Rc::clone(&target))
                .with_label(LabelModel::new(LabelOptions::default().with_text("t"))),
        );
        link.set_path("M 1 2 L 3 4");

        let clone = link.deep_clone();

        assert_ne!(clone.id(), link.id());
        assert_eq!(xs(&clone), vec![1.0, 3.0]);
        assert!(clone.points().iter().all(|point| {
            point.parent().is_some_and(|parent| Rc::ptr_eq(&parent, clone.root()))
        }));
        assert_eq!(clone.label().map(|label| label.text()), Some("t".to_string()));
        assert_eq!(clone.path(), link.path());

        let cloned_source = clone.source_port().unwrap();
        assert!(!Rc::ptr_eq(&cloned_source, &source));
        assert!(cloned_source.has_link(clone.id()));
        assert!(!source.has_link(clone.id()));
        assert_eq!(source.link_count(), 1);
    }
}
