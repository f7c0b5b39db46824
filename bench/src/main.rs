use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde_json::json;
use sha2::Digest as _;

use mosaic::{
    BlendMode, DisplayState, FrameRGB, Image, ImageBaseType, Layer, PixelFormat, Projection, Rect,
    RenderSettings, ScaledRenderer, TileStore,
};

#[derive(Clone, Debug)]
struct BenchArgs {
    width: u32,
    height: u32,
    layers: u32,
    warmup: u32,
    repeats: u32,
    scales: Vec<f64>,
}

#[derive(Clone, Debug, Default)]
struct RunMetrics {
    composite: Duration,
    render_reuse: Duration,
    render_no_reuse: Duration,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width/--height must be > 0");
    }
    if args.layers == 0 {
        anyhow::bail!("--layers must be >= 1");
    }
    if args.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        anyhow::bail!("--scales must all be positive");
    }

    let mut image = build_image(&args)?;
    eprintln!(
        "bench: {repeats} run(s) ({profile} build), {w}x{h}, {layers} layer(s), scales={scales:?}",
        repeats = args.repeats,
        profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        w = args.width,
        h = args.height,
        layers = args.layers,
        scales = args.scales,
    );

    for _ in 0..args.warmup {
        let _ = run_once(&args, &mut image)?;
    }
    let mut runs = Vec::<RunMetrics>::with_capacity(args.repeats as usize);
    let mut digests = Vec::new();
    for _ in 0..args.repeats {
        let (metrics, run_digests) = run_once(&args, &mut image)?;
        runs.push(metrics);
        digests = run_digests;
    }

    report_percentiles(&runs);
    let report = json!({
        "width": args.width,
        "height": args.height,
        "layers": args.layers,
        "repeats": args.repeats,
        "frames": digests
            .iter()
            .map(|(scale, digest)| json!({ "scale": scale, "sha256": digest }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn build_image(args: &BenchArgs) -> anyhow::Result<Image> {
    let (w, h) = (args.width, args.height);
    let mut image = Image::new(w, h, ImageBaseType::Rgb);
    image.add_layer(Layer::new("background", pattern(w, h, PixelFormat::Rgb, 0)?));
    let modes = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
    ];
    for i in 1..args.layers {
        let (lw, lh) = ((w * 2 / 3).max(1), (h * 2 / 3).max(1));
        let layer = Layer::new(format!("layer {i}"), pattern(lw, lh, PixelFormat::Rgba, i)?)
            .with_offset((i * 17 % w) as i32 - 8, (i * 11 % h) as i32 - 8)
            .with_mode(modes[i as usize % modes.len()])
            .with_opacity(0.75);
        image.add_layer(layer);
    }
    Ok(image)
}

fn pattern(w: u32, h: u32, format: PixelFormat, seed: u32) -> anyhow::Result<TileStore> {
    let bpp = format.bytes() as u32;
    let raw: Vec<u8> = (0..w * h * bpp)
        .map(|i| (i.wrapping_mul(2_654_435_761).wrapping_add(seed) >> 11) as u8)
        .collect();
    TileStore::from_raw(w, h, format, &raw).context("build layer pixels")
}

fn run_once(
    args: &BenchArgs,
    image: &mut Image,
) -> anyhow::Result<(RunMetrics, Vec<(f64, String)>)> {
    let mut metrics = RunMetrics::default();
    let mut projection = Projection::for_image(image);

    let t0 = Instant::now();
    let full = image.bounds();
    projection.construct_projection(image, full)?;
    metrics.composite = t0.elapsed();

    let mut reuse = ScaledRenderer::new(RenderSettings::default());
    let mut no_reuse = ScaledRenderer::new(RenderSettings {
        row_reuse: false,
        ..RenderSettings::default()
    });
    let view = Rect::new(0, 0, args.width as i32, args.height as i32);
    let mut digests = Vec::with_capacity(args.scales.len());
    for &scale in &args.scales {
        let display = DisplayState::default().with_scale(scale, scale);
        let mut frame = FrameRGB::new(args.width, args.height);

        let t = Instant::now();
        reuse.render(&projection, &display, view, None, &mut frame)?;
        metrics.render_reuse += t.elapsed();
        digests.push((scale, sha256_hex(&frame.data)));

        let t = Instant::now();
        no_reuse.render(&projection, &display, view, None, &mut frame)?;
        metrics.render_no_reuse += t.elapsed();
    }
    Ok((metrics, digests))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        width: 1024,
        height: 768,
        layers: 4,
        warmup: 1,
        repeats: 20,
        scales: vec![0.25, 0.5, 0.8, 1.0, 2.0, 3.5],
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--width" => out.width = parse_u32(args.next(), "--width")?,
            "--height" => out.height = parse_u32(args.next(), "--height")?,
            "--layers" => out.layers = parse_u32(args.next(), "--layers")?,
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--scales" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value for --scales"))?;
                out.scales = v
                    .split(',')
                    .map(|s| {
                        s.trim()
                            .parse::<f64>()
                            .with_context(|| format!("parse --scales entry '{s}'"))
                    })
                    .collect::<anyhow::Result<_>>()?;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"mosaic-bench

Composites a layered image and renders it at several zoom levels, with and
without row reuse, then reports p50/p90/p99 for each stage.

Usage:
  cargo run -q --release
  cargo run -q --release -- --width 2048 --height 1536 --layers 8

Args:
  --width N        (default 1024)
  --height N       (default 768)
  --layers N       (default 4)
  --warmup N       (default 1)
  --repeats N      (default 20)
  --scales LIST    comma separated zoom factors (default 0.25,0.5,0.8,1,2,3.5)
"#
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn report_percentiles(runs: &[RunMetrics]) {
    type Getter = fn(&RunMetrics) -> Duration;
    type Field = (&'static str, Getter);

    fn collect(runs: &[RunMetrics], f: Getter) -> Vec<Duration> {
        let mut v = runs.iter().map(f).collect::<Vec<_>>();
        v.sort_by_key(|d| d.as_nanos());
        v
    }

    fn p(v: &[Duration], p: f64) -> Duration {
        if v.is_empty() {
            return Duration::ZERO;
        }
        let n = v.len();
        let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
        v[rank - 1]
    }

    fn fmt_ms(d: Duration) -> String {
        format!("{:.3}ms", d.as_secs_f64() * 1000.0)
    }

    let fields: &[Field] = &[
        ("composite", |m| m.composite),
        ("render_reuse", |m| m.render_reuse),
        ("render_no_reuse", |m| m.render_no_reuse),
    ];

    eprintln!("\npercentiles across runs (p50/p90/p99):");
    for (name, getter) in fields {
        let v = collect(runs, *getter);
        eprintln!(
            "  {name:16} p50={p50:>10}  p90={p90:>10}  p99={p99:>10}",
            name = *name,
            p50 = fmt_ms(p(&v, 0.50)),
            p90 = fmt_ms(p(&v, 0.90)),
            p99 = fmt_ms(p(&v, 0.99)),
        );
    }
}
