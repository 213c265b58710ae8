pub mod animatable;
pub mod builder;
pub mod debug;
pub mod easing;
pub mod error;
pub mod geometry;
pub mod player;
pub mod renderer;
pub mod scene;
pub mod style;
pub mod transform;

pub use animatable::{Animator, Interpolatable};
pub use builder::{Drawable, SceneBuilder, SceneModel, StyleRole};
pub use easing::CubicBezier;
pub use error::{EngineError, EngineResult};
pub use player::{
    Clock, ManualClock, ManualScheduler, MonotonicClock, PlaybackState, Player, Scheduler, TickId,
};
pub use renderer::FrameRenderer;
pub use scene::{ElementKind, NodeId, SceneGraph};
pub use style::IdAllocator;
pub use transform::{EffectiveTransform, TransformComposer};

use lottie_data::model::Animation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Prefix of generated element ids; distinct per engine sharing a document.
    pub namespace: String,
    /// Render the first frame as part of mounting.
    pub render_on_mount: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            namespace: "lottie".to_string(),
            render_on_mount: true,
        }
    }
}

/// An animation mounted into a scene graph.
pub struct Engine {
    animation: Animation,
    scene: SceneGraph,
    model: SceneModel,
    renderer: FrameRenderer,
    container: NodeId,
}

impl Engine {
    /// Builds the animation's elements under the element whose `id` is
    /// `container_id`.
    pub fn mount(
        animation: Animation,
        mut scene: SceneGraph,
        container_id: &str,
        options: EngineOptions,
    ) -> EngineResult<Self> {
        let container = scene
            .find_by_id(container_id)
            .ok_or_else(|| EngineError::ContainerNotFound(container_id.to_string()))?;

        let mut ids = IdAllocator::new(options.namespace);
        let model = SceneBuilder::new(&animation, &mut scene, &mut ids, container).build();

        tracing::info!(
            name = animation.nm.as_deref().unwrap_or("unnamed"),
            fr = animation.fr,
            frames = animation.total_frames(),
            drawables = model.drawables.len(),
            "animation mounted"
        );

        let mut engine = Self {
            animation,
            scene,
            model,
            renderer: FrameRenderer::new(),
            container,
        };
        if options.render_on_mount {
            let ip = engine.animation.ip;
            engine.render_frame(ip);
        }
        Ok(engine)
    }

    /// Renders one composition frame, independent of any playback clock.
    pub fn render_frame(&mut self, frame: f32) {
        self.renderer
            .render_frame(&mut self.scene, &self.model, frame);
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn model(&self) -> &SceneModel {
        &self.model
    }

    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn into_scene(self) -> SceneGraph {
        self.scene
    }
}
