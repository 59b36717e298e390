use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn top_left_world(&self, camera: &Camera2D) -> Vec2 {
        Vec2 {
            x: camera.position.x - self.width as f32 * 0.5,
            y: camera.position.y - self.height as f32 * 0.5,
        }
    }
}

/// World pixels map 1:1 onto framebuffer pixels; both use y down.
pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let origin = viewport.top_left_world(camera);
    (
        (world.x - origin.x).floor() as i32,
        (world.y - origin.y).floor() as i32,
    )
}

pub fn screen_to_world_px(screen: (i32, i32), camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let origin = viewport.top_left_world(camera);
    Vec2 {
        x: origin.x + screen.0 as f32,
        y: origin.y + screen.1 as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Viewport = Viewport {
        width: 256,
        height: 176,
    };

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let camera = Camera2D {
            position: Vec2 { x: 1920.0, y: 1320.0 },
        };
        assert_eq!(world_to_screen_px(camera.position, &camera, SCREEN), (128, 88));
    }

    #[test]
    fn screen_origin_maps_to_top_left_pixel() {
        let camera = Camera2D {
            position: Vec2 { x: 1920.0, y: 1320.0 },
        };
        assert_eq!(
            world_to_screen_px(Vec2 { x: 1792.0, y: 1232.0 }, &camera, SCREEN),
            (0, 0)
        );
        assert_eq!(
            screen_to_world_px((0, 0), &camera, SCREEN),
            Vec2 { x: 1792.0, y: 1232.0 }
        );
    }

    #[test]
    fn positions_left_of_view_are_negative() {
        let camera = Camera2D {
            position: Vec2 { x: 128.0, y: 88.0 },
        };
        assert_eq!(
            world_to_screen_px(Vec2 { x: -0.5, y: 10.0 }, &camera, SCREEN),
            (-1, 10)
        );
    }
}
