use runtime::frame::Frame;

use crate::layer::LayerId;

/// Recorded paint operation. Pixel coordinates have a top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    ClipRect { x: f64, y: f64, width: f64, height: f64 },
    Restore,
    DrawLayer {
        layer: LayerId,
        z_index: i64,
        opacity: f64,
        tiles: usize,
    },
}

/// Handed to render hooks. Hooks record commands around the layer's own draw.
#[derive(Debug)]
pub struct RenderContext {
    frame: Frame,
    size: [u32; 2],
    layer: Option<LayerId>,
    commands: Vec<DrawCommand>,
}

impl RenderContext {
    pub(crate) fn new(frame: Frame, size: [u32; 2]) -> Self {
        Self {
            frame,
            size,
            layer: None,
            commands: Vec::new(),
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// The layer currently being painted.
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    pub(crate) fn set_layer(&mut self, layer: Option<LayerId>) {
        self.layer = layer;
    }

    pub fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    pub fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    pub fn clip_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.commands.push(DrawCommand::ClipRect {
            x,
            y,
            width,
            height,
        });
    }

    pub(crate) fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub(crate) fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }
}

/// Result of painting one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: Frame,
    /// Layers painted, bottom first.
    pub painted: Vec<LayerId>,
    pub commands: Vec<DrawCommand>,
}
