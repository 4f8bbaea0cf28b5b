// src/ui.rs
use crate::config::SimParams; // JSON body of a simulation request
use crate::error::SimulationError;
use crate::plot::{angle_charts, position_charts, spread_chart, PositionCharts}; // Chart rendering
use crate::reference::{model_angles, MEASURED_START_ANGLES};
use crate::trajectory::{Segments, Trajectory}; // Sampling driver and renderer geometry
use actix_web::{web, HttpResponse, Result}; // Actix-web types for request handling and HTTP responses
use serde::Serialize; // JSON serialization of responses
use tracing::warn;

/// Shared, read-only handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ceiling on integration steps per request
    pub max_steps: u64,
}

#[derive(Serialize)]
struct SimResponse {
    success: bool,                 // Whether the simulation succeeded
    error: Option<String>,         // Why it did not
    images: ChartImages,           // Base64 PNG data URLs; empty when not rendered
    animation_data: AnimationData, // Frames for the browser renderer
}

/// Every lane's series vs t, one chart each, plus the ensemble spread.
#[derive(Serialize, Default)]
struct ChartImages {
    theta1: String,
    theta2: String,
    x1: String,
    y1: String,
    x2: String,
    y2: String,
    sigma: String,
}

impl ChartImages {
    /// Renders every chart; a failed chart is logged and left empty.
    fn render(traj: &Trajectory) -> Self {
        let (theta1, theta2) = angle_charts(traj).unwrap_or_else(|err| {
            warn!(error = %err, "angle charts not rendered");
            (String::new(), String::new())
        });
        let PositionCharts { x1, y1, x2, y2 } = position_charts(traj).unwrap_or_else(|err| {
            warn!(error = %err, "position charts not rendered");
            PositionCharts::default()
        });
        let sigma = spread_chart(traj).unwrap_or_else(|err| {
            warn!(error = %err, "spread chart not rendered");
            String::new()
        });
        Self { theta1, theta2, x1, y1, x2, y2, sigma }
    }
}

#[derive(Serialize, Default)]
struct AnimationData {
    times: Vec<f64>,            // Model clock of each frame
    frames: Vec<Vec<Segments>>, // Per frame, per lane: pivot, elbow, tip (metres, y down)
    lanes: usize,               // Number of pendulums
    limit: f64,                 // Half-width of the view for consistent scaling
}

#[derive(Serialize)]
struct ReferenceAngles {
    theta1: Vec<f64>,
    theta2: Vec<f64>,
}

impl SimResponse {
    fn failure(err: &SimulationError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            images: ChartImages::default(),
            animation_data: AnimationData::default(),
        }
    }
}

/// Runs one request end to end: build the model, sample it, render charts and frames.
fn run(params: &SimParams, max_steps: u64) -> crate::error::Result<SimResponse> {
    params.validate(max_steps)?;
    let mut sim = params.build_model()?;
    let traj = Trajectory::sample(sim.as_mut(), params.t_end, params.sample_interval)?;
    // Charts are optional output: a rendering failure (e.g. no usable font) still returns frames.
    let images = ChartImages::render(&traj);

    Ok(SimResponse {
        success: true,
        error: None,
        images,
        animation_data: AnimationData {
            times: traj.times.clone(),
            frames: traj.segment_frames(1.0),
            lanes: traj.lanes(),
            limit: traj.reach() * 1.1,
        },
    })
}

/// `POST /api/simulate`
pub async fn simulate_handler(
    state: web::Data<AppState>,
    params: web::Json<SimParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let max_steps = state.max_steps;
    // Stepping is CPU-bound; keep it off the async worker.
    let outcome = web::block(move || run(&params, max_steps)).await?;

    match outcome {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(err) => {
            warn!(error = %err, "simulation request rejected");
            Ok(HttpResponse::BadRequest().json(SimResponse::failure(&err)))
        }
    }
}

/// `GET /api/reference-angles`: the measured starting pairs in model convention.
pub async fn reference_angles_handler() -> HttpResponse {
    let (theta1, theta2) = model_angles(&MEASURED_START_ANGLES);
    HttpResponse::Ok().json(ReferenceAngles {
        theta1: theta1.iter().copied().collect(),
        theta2: theta2.iter().copied().collect(),
    })
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/simulate", web::post().to(simulate_handler))
        .route("/api/reference-angles", web::get().to(reference_angles_handler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AngleSource, ModelSpec};
    use actix_web::{test, App};

    fn app_state() -> web::Data<AppState> {
        web::Data::new(AppState { max_steps: 100_000 })
    }

    #[actix_web::test]
    async fn test_simulate_returns_frames_and_images() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;
        let params = SimParams {
            model: ModelSpec::Ideal { g: 9.81, m1: 1.0, m2: 1.0, l1: 1.0, l2: 1.0 },
            dt: 1e-3,
            t_end: 0.5,
            sample_interval: 0.1,
            theta1: vec![1.0, 1.0001],
            theta2: vec![0.5, 0.5],
            ..SimParams::default()
        };
        let req = test::TestRequest::post().uri("/api/simulate").set_json(&params).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["animation_data"]["lanes"], 2);
        assert_eq!(body["animation_data"]["frames"].as_array().unwrap().len(), 5);
        for key in ["theta1", "theta2", "x1", "y1", "x2", "y2", "sigma"] {
            let image = body["images"][key].as_str().unwrap();
            assert!(image.is_empty() || image.starts_with("data:image/png;base64,"), "{key}");
        }
    }

    #[actix_web::test]
    async fn test_simulate_rejects_over_budget() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;
        let params = SimParams {
            angle_source: AngleSource::Reference,
            dt: 1e-5,
            t_end: 15.0,
            ..SimParams::default()
        };
        let req = test::TestRequest::post().uri("/api/simulate").set_json(&params).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("step budget"));
    }

    #[actix_web::test]
    async fn test_simulate_rejects_tiny_sample_interval() {
        let app = test::init_service(App::new().app_data(app_state()).configure(configure)).await;
        for interval in [1e-300, 1e-7] {
            let params = SimParams {
                dt: 0.25,
                t_end: 1.0,
                sample_interval: interval,
                ..SimParams::default()
            };
            let req = test::TestRequest::post().uri("/api/simulate").set_json(&params).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert!(body["error"].as_str().unwrap().contains("sample budget"));
        }
    }

    #[actix_web::test]
    async fn test_reference_angles() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/reference-angles").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["theta1"].as_array().unwrap().len(), MEASURED_START_ANGLES.len());
    }
}
