use tracing::trace;

use crate::context::{MapRef, SceneContext, SceneScope};
use crate::error::LayerError;
use crate::group::ZBand;
use crate::reconciler::{LayerSlot, Reconcile, SlotOutcome};

/// A node that renders from a scope plus its own props.
pub trait Render<P> {
    type Output;

    fn render(&mut self, scope: &SceneScope, props: &P) -> Result<Self::Output, LayerError>;

    fn display_name(&self) -> String;
}

struct Memo<P, R> {
    map: MapRef,
    band: ZBand,
    props: P,
    output: R,
}

/// Adapter that injects the scene context into a presentation function.
///
/// The function runs again only when the map, the nearest band or the props
/// changed since the previous render; otherwise the last output is returned.
pub struct SceneNode<P, R, F> {
    name: String,
    render: F,
    memo: Option<Memo<P, R>>,
    invocations: u64,
}

pub fn wrap<P, R, F>(name: impl Into<String>, render: F) -> SceneNode<P, R, F>
where
    F: Fn(&SceneContext, &P) -> R,
{
    SceneNode {
        name: name.into(),
        render,
        memo: None,
        invocations: 0,
    }
}

impl<P, R, F> SceneNode<P, R, F> {
    /// How many times the wrapped function actually ran.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl<P, R, F> Render<P> for SceneNode<P, R, F>
where
    P: Clone + PartialEq,
    R: Clone,
    F: Fn(&SceneContext, &P) -> R,
{
    type Output = R;

    fn render(&mut self, scope: &SceneScope, props: &P) -> Result<R, LayerError> {
        let ctx = SceneContext::from_scope(scope)?;
        let band = ctx.band();
        if let Some(memo) = &self.memo
            && memo.map.ptr_eq(ctx.map())
            && memo.band == band
            && memo.props == *props
        {
            return Ok(memo.output.clone());
        }

        trace!(node = %self.display_name(), "scene node rendering");
        let output = (self.render)(&ctx, props);
        self.invocations += 1;
        self.memo = Some(Memo {
            map: ctx.map().clone(),
            band,
            props: props.clone(),
            output: output.clone(),
        });
        Ok(output)
    }

    fn display_name(&self) -> String {
        format!("Scene({})", self.name)
    }
}

/// Wrapper around an existing node. It forwards the scope unchanged instead
/// of reading the channels a second time, so the nearest group published in
/// the scope still wins.
pub struct Wrapped<N> {
    inner: N,
}

pub fn wrap_node<N>(inner: N) -> Wrapped<N> {
    Wrapped { inner }
}

impl<N> Wrapped<N> {
    pub fn inner(&self) -> &N {
        &self.inner
    }
}

impl<P, N: Render<P>> Render<P> for Wrapped<N> {
    type Output = N::Output;

    fn render(&mut self, scope: &SceneScope, props: &P) -> Result<N::Output, LayerError> {
        self.inner.render(scope, props)
    }

    fn display_name(&self) -> String {
        format!("Scene({})", self.inner.display_name())
    }
}

/// A layer slot rendered as a scene node: `None` props mean content absent.
impl<R: Reconcile> Render<Option<R::Descriptor>> for LayerSlot<R> {
    type Output = SlotOutcome;

    fn render(
        &mut self,
        scope: &SceneScope,
        props: &Option<R::Descriptor>,
    ) -> Result<SlotOutcome, LayerError> {
        let ctx = SceneContext::from_scope(scope)?;
        self.sync(&ctx, props.as_ref())
    }

    fn display_name(&self) -> String {
        let ty = std::any::type_name::<R>();
        let short = ty.rsplit("::").next().unwrap_or(ty);
        format!("LayerSlot({short})")
    }
}
