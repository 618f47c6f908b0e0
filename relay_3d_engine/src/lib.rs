/*!
# Relay 3D Engine

Backend layer that lets an immediate-mode drawing API (set matrix, set tint, bind
texture, draw mesh) run on top of an explicit GPU API where pipelines, bindings and
uniform data must be resolved before a draw is recorded.

## Architecture

- **GraphicsDevice**: explicit-API factory trait (buffers, textures, pipelines, command lists)
- **ResourceManager**: handle allocator and resource tables
- **MeshCache**: interleaves meshes and expands fan/loop topologies
- **UniformRing**: per-draw dynamic uniform slots, reset each frame
- **FrameRecorder**: frame / render-pass state machine with lazily opened passes
- **RenderBackend**: polymorphic backend interface, implemented by `ExplicitBackend`
- **ImmediateContext**: legacy numeric-id drawing layer with an injected backend

Backend implementations (Vulkan) provide concrete types for the device traits.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod device;
pub mod resource;
pub mod mesh;
pub mod uniform;
pub mod shading;
pub mod frame;
pub mod bridge;
pub mod backend;
pub mod immediate;

// Main relay3d namespace module
pub mod relay3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine (logger management)
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::BackendConfig;

    // Backend interface
    pub use crate::backend::{RenderBackend, ExplicitBackend};

    // Legacy drawing layer
    pub use crate::immediate::ImmediateContext;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Explicit GPU device abstraction
    pub mod device {
        pub use crate::device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Mesh sub-module
    pub mod mesh {
        pub use crate::mesh::*;
    }

    // Uniform layouts and ring allocator
    pub mod uniform {
        pub use crate::uniform::*;
    }

    // Shading-mode selection
    pub mod shading {
        pub use crate::shading::*;
    }

    // Frame state machine
    pub mod frame {
        pub use crate::frame::*;
    }

    // Legacy id bridges
    pub mod bridge {
        pub use crate::bridge::*;
    }
}

// Re-export math library at crate root
pub use glam;
