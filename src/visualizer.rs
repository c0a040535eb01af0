use std::sync::{Arc, Mutex, mpsc};

use bevy::prelude::*;

use crate::infra::ControlSignal;
use crate::infra::visualizing_observer::Snapshot;
use crate::state::Cell;

const TILE_SIZE: f32 = 32.0;
const WINDOW_WIDTH: f32 = 960.0;
const WINDOW_HEIGHT: f32 = 800.0;

#[derive(Resource)]
pub struct SnapshotResource {
    pub state: Arc<Mutex<Option<Snapshot>>>,
    pub last_version: Option<u64>,
    pub camera_initialized: bool,
}

#[derive(Resource)]
pub struct ControlChannel {
    sender: mpsc::Sender<ControlSignal>,
}

#[derive(Component)]
struct GridEntity;

/// Opens the window and blocks until it is closed.
pub fn run_visualizer(state: Arc<Mutex<Option<Snapshot>>>, signals: mpsc::Sender<ControlSignal>) {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Courier Training".to_string(),
                resolution: (WINDOW_WIDTH as u32, WINDOW_HEIGHT as u32).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .insert_resource(SnapshotResource {
            state,
            last_version: None,
            camera_initialized: false,
        })
        .insert_resource(ControlChannel { sender: signals })
        .add_systems(Startup, setup)
        .add_systems(Update, (handle_keys, update_grid))
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn handle_keys(keys: Res<ButtonInput<KeyCode>>, control: Res<ControlChannel>) {
    if keys.just_pressed(KeyCode::Escape) {
        tracing::info!("Close requested from visualizer");
        let _ = control.sender.send(ControlSignal::Close);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        tracing::info!("Reset requested from visualizer");
        let _ = control.sender.send(ControlSignal::Reset);
    }
}

fn update_grid(
    mut commands: Commands,
    mut resource: ResMut<SnapshotResource>,
    query: Query<Entity, With<GridEntity>>,
    mut camera_query: Query<&mut Transform, With<Camera2d>>,
) {
    let snapshot = {
        let Ok(guard) = resource.state.lock() else {
            return;
        };
        let Some(snapshot) = guard.as_ref() else {
            return;
        };
        if Some(snapshot.version) == resource.last_version {
            return;
        }
        snapshot.clone()
    };
    resource.last_version = Some(snapshot.version);

    for entity in query.iter() {
        commands.entity(entity).despawn();
    }

    let world = &snapshot.world;
    if !resource.camera_initialized
        && let Ok(mut camera_transform) = camera_query.single_mut()
    {
        let width = world.width() as f32 * TILE_SIZE;
        let height = world.height() as f32 * TILE_SIZE;
        let scale = (WINDOW_WIDTH / width).min(WINDOW_HEIGHT / height) * 0.9;

        camera_transform.translation.x = (world.width() - 1) as f32 * TILE_SIZE / 2.0;
        camera_transform.translation.y = -((world.height() - 1) as f32 * TILE_SIZE / 2.0);
        camera_transform.scale = Vec3::splat(1.0 / scale);
        resource.camera_initialized = true;
    }

    for (pos, cell) in world.grid().iter() {
        commands.spawn((
            Sprite {
                color: cell_color(cell),
                custom_size: Some(Vec2::splat(TILE_SIZE - 2.0)),
                ..default()
            },
            Transform::from_xyz(pos.x as f32 * TILE_SIZE, -(pos.y as f32 * TILE_SIZE), 0.0),
            GridEntity,
        ));
    }

    commands.spawn((
        Text::new(format!(
            "Episode: {} | Phase: {} | Reward: {:.2} | Epsilon: {:.3} | Carrying: {}",
            snapshot.episode,
            snapshot.phase,
            snapshot.reward,
            snapshot.epsilon,
            if world.is_carrying() { "YES" } else { "NO" }
        )),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        GridEntity,
    ));
}

fn cell_color(cell: Cell) -> Color {
    match cell {
        Cell::Empty => Color::srgb(0.2, 0.2, 0.2),
        Cell::Obstacle => Color::srgb(0.5, 0.5, 0.5),
        Cell::Object => Color::srgb(0.6, 0.5, 0.4),
        Cell::Target => Color::srgb(0.0, 1.0, 0.0),
        Cell::Robot => Color::srgb(1.0, 1.0, 0.0),
    }
}
