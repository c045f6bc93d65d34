// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use failure::{bail, Error};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use itertools::Itertools;
use num::{clamp, Complex};
use rand::Rng;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fractals::convert::{self, DisplayBuffers};
use fractals::planes::{Pixel, PlaneMapper};
use fractals::{
    chaos, contraction, escape, presets, subdivision, AffineTransform2D, CancellationToken,
    Generated, IfsEngine, Point,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

/// `a,b,c,d,e,f`, optionally followed by `@probability`.
fn parse_transform(s: &str) -> Option<(AffineTransform2D, f64)> {
    let (coefficients, probability) = match s.find('@') {
        Some(index) => (&s[..index], f64::from_str(&s[index + 1..]).ok()?),
        None => (s, 1.0),
    };
    let c: Vec<f64> = coefficients
        .split(',')
        .map(|v| f64::from_str(v.trim()))
        .collect::<Result<_, _>>()
        .ok()?;
    if c.len() != 6 {
        return None;
    }
    Some((
        AffineTransform2D::new(c[0], c[1], c[2], c[3], c[4], c[5]),
        probability,
    ))
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const POINTS: &str = "points";
const SEED: &str = "seed";
const ORDER: &str = "order";
const SIDE: &str = "side";
const TRANSFORM: &str = "transform";
const VERBOSE: &str = "verbose";

fn output_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(OUTPUT)
        .required(true)
        .long(OUTPUT)
        .short("o")
        .takes_value(true)
        .help("Output file (binary PGM)")
}

fn size_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(SIZE)
        .required(false)
        .long(SIZE)
        .short("s")
        .takes_value(true)
        .default_value("800x600")
        .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
        .help("Size of output image")
}

fn threads_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(THREADS)
        .required(false)
        .long(THREADS)
        .short("t")
        .takes_value(true)
        .validator(move |s| {
            validate_range(
                &s,
                1,
                convert::MAX_THREADS,
                "Could not parse thread count",
                &format!("Thread count must be between 1 and {}", convert::MAX_THREADS),
            )
        })
        .help("Number of threads used to prepare large point clouds")
}

fn points_arg<'a, 'b>(default: &'a str) -> Arg<'a, 'b> {
    Arg::with_name(POINTS)
        .required(false)
        .long(POINTS)
        .short("n")
        .takes_value(true)
        .default_value(default)
        .validator(|s| {
            validate_range(
                &s,
                0,
                50_000_000,
                "Could not parse point count",
                "Point count must be between 0 and 50000000",
            )
        })
        .help("Number of chaos-game iterations to record")
}

fn seed_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(SEED)
        .required(false)
        .long(SEED)
        .takes_value(true)
        .validator(|s| match u64::from_str(&s) {
            Ok(_) => Ok(()),
            Err(_) => Err("Could not parse seed".to_string()),
        })
        .help("Seed for the random generator; random if omitted")
}

fn order_arg<'a, 'b>(default: &'a str, max: u32) -> Arg<'a, 'b> {
    Arg::with_name(ORDER)
        .required(false)
        .long(ORDER)
        .short("k")
        .takes_value(true)
        .default_value(default)
        .validator(move |s| {
            validate_range(
                &s,
                0,
                max,
                "Could not parse recursion order",
                &format!("Recursion order must be between 0 and {}", max),
            )
        })
        .help("Recursion depth")
}

fn transform_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(TRANSFORM)
        .required(true)
        .long(TRANSFORM)
        .short("T")
        .takes_value(true)
        .multiple(true)
        .number_of_values(1)
        .allow_hyphen_values(true)
        .validator(|s| match parse_transform(&s) {
            Some(_) => Ok(()),
            None => Err("Transforms are written a,b,c,d,e,f or a,b,c,d,e,f@probability".to_string()),
        })
        .help("An affine map x' = ax + by + e, y' = cx + dy + f; repeat for each map")
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractal")
        .version("0.1.0")
        .about("Fractal generator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .global(true)
                .help("Log generation progress to stderr"),
        )
        .subcommand(
            SubCommand::with_name("mandelbrot")
                .about("Escape-time rendering of the Mandelbrot set")
                .arg(output_arg())
                .arg(size_arg())
                .arg(
                    Arg::with_name(LEFTLOWER)
                        .required(false)
                        .long(LEFTLOWER)
                        .short("l")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .default_value("-2.0,-1.5")
                        .validator(|s| {
                            validate_pair::<f64>(&s, ',', "Could not parse left lower corner")
                        })
                        .help("Left lower corner of the complex window"),
                )
                .arg(
                    Arg::with_name(RIGHTUPPER)
                        .required(false)
                        .long(RIGHTUPPER)
                        .short("r")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .default_value("1.0,1.5")
                        .validator(|s| {
                            validate_pair::<f64>(&s, ',', "Could not parse right upper corner")
                        })
                        .help("Right upper corner of the complex window"),
                )
                .arg(
                    Arg::with_name(ITERATIONS)
                        .required(false)
                        .long(ITERATIONS)
                        .short("i")
                        .takes_value(true)
                        .default_value("256")
                        .validator(|s| {
                            validate_range(
                                &s,
                                1,
                                200_000,
                                "Could not parse iteration count",
                                "Iteration count must be between 1 and 200000",
                            )
                        })
                        .help("Iterations before a sample is presumed inside the set"),
                ),
        )
        .subcommand(
            SubCommand::with_name("fern")
                .about("Barnsley's fern by the chaos game")
                .arg(output_arg())
                .arg(size_arg())
                .arg(points_arg("200000"))
                .arg(seed_arg())
                .arg(threads_arg()),
        )
        .subcommand(
            SubCommand::with_name("ifs")
                .about("A user-supplied iterated function system by the chaos game")
                .arg(output_arg())
                .arg(size_arg())
                .arg(transform_arg())
                .arg(points_arg("100000"))
                .arg(seed_arg())
                .arg(threads_arg()),
        )
        .subcommand(
            SubCommand::with_name("chaos")
                .about("The Sierpinski triangle by the chaos game")
                .arg(output_arg())
                .arg(size_arg())
                .arg(points_arg("100000"))
                .arg(seed_arg())
                .arg(threads_arg()),
        )
        .subcommand(
            SubCommand::with_name("koch")
                .about("The Koch snowflake")
                .arg(output_arg())
                .arg(size_arg())
                .arg(order_arg("4", 10))
                .arg(
                    Arg::with_name(SIDE)
                        .required(false)
                        .long(SIDE)
                        .takes_value(true)
                        .default_value("1.0")
                        .validator(|s| match f64::from_str(&s) {
                            Ok(v) if v > 0.0 && v.is_finite() => Ok(()),
                            _ => Err("Side length must be a positive number".to_string()),
                        })
                        .help("Side length of the base triangle"),
                ),
        )
        .subcommand(
            SubCommand::with_name("sierpinski")
                .about("The Sierpinski triangle by recursive subdivision")
                .arg(output_arg())
                .arg(size_arg())
                .arg(order_arg("5", 12)),
        )
        .subcommand(
            SubCommand::with_name("check")
                .about("Report whether a set of affine maps are all contractions")
                .arg(transform_arg()),
        )
        .get_matches()
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))?;
    Ok(())
}

// A plotting surface: hit counts per pixel over a window fitted around
// whatever is being drawn.
struct Canvas {
    plane: PlaneMapper,
    counts: Vec<u32>,
}

impl Canvas {
    /// Fit a window around every point, padded, with the same aspect
    /// ratio as the image so nothing is stretched.
    fn fitted<I: Iterator<Item = (f64, f64)>>(
        points: I,
        size: (usize, usize),
    ) -> Result<Canvas, Error> {
        let (mut lo, mut hi) = (
            Point::new(std::f64::INFINITY, std::f64::INFINITY),
            Point::new(std::f64::NEG_INFINITY, std::f64::NEG_INFINITY),
        );
        for (x, y) in points {
            lo = Point::new(lo.x.min(x), lo.y.min(y));
            hi = Point::new(hi.x.max(x), hi.y.max(y));
        }
        if !lo.is_finite() || !hi.is_finite() {
            bail!("Nothing to draw");
        }

        let center = lo.midpoint(hi);
        let aspect = size.0 as f64 / size.1 as f64;
        let span_y = ((hi.y - lo.y).max((hi.x - lo.x) / aspect) * 1.05).max(1e-9);
        let span_x = span_y * aspect;
        let plane = PlaneMapper::new(
            size.0,
            size.1,
            Complex::new(center.x - span_x / 2.0, center.y - span_y / 2.0),
            Complex::new(center.x + span_x / 2.0, center.y + span_y / 2.0),
        )?;
        Ok(Canvas {
            counts: vec![0; plane.len()],
            plane,
        })
    }

    fn plot(&mut self, x: f64, y: f64) {
        if let Some(Pixel { row, col }) = self.plane.point_to_pixel(&Complex::new(x, y)) {
            // Image rows run top down; plane rows run bottom up.
            let offset = (self.plane.height() - 1 - row) * self.plane.width() + col;
            self.counts[offset] = self.counts[offset].saturating_add(1);
        }
    }

    fn line(&mut self, from: Point, to: Point) {
        let (ll, ru) = (self.plane.complex_plane.0, self.plane.complex_plane.1);
        let across = (to.x - from.x).abs() / (ru.re - ll.re) * self.plane.width() as f64;
        let down = (to.y - from.y).abs() / (ru.im - ll.im) * self.plane.height() as f64;
        let steps = (across.max(down).ceil() as usize).max(1);
        for i in 0..=steps {
            let p = from + (to - from) * (i as f64 / steps as f64);
            self.plot(p.x, p.y);
        }
    }

    /// Anything hit at all shows up; the most-hit pixels go white.
    fn pixelate(&self) -> Vec<u8> {
        let maxi = self.counts.iter().cloned().max().unwrap_or(0).max(1) as u64;
        self.counts
            .iter()
            .map(|&s| {
                if s == 0 {
                    0
                } else {
                    clamp(64 + (u64::from(s) * 191) / maxi, 0, 255) as u8
                }
            })
            .collect()
    }
}

fn image_size(matches: &ArgMatches) -> Result<(usize, usize), Error> {
    match matches.value_of(SIZE).and_then(|s| parse_pair(s, 'x')) {
        Some((w, h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => bail!("Error parsing image dimensions"),
    }
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, Error> {
    match matches.value_of(name).map(T::from_str) {
        Some(Ok(v)) => Ok(v),
        _ => bail!("Could not parse --{}", name),
    }
}

fn seed(matches: &ArgMatches) -> Result<u64, Error> {
    if matches.is_present(SEED) {
        value(matches, SEED)
    } else {
        let seed: u64 = rand::thread_rng().gen();
        info!(seed, "no seed given, picked one");
        Ok(seed)
    }
}

fn threads(matches: &ArgMatches) -> Result<usize, Error> {
    if matches.is_present(THREADS) {
        value(matches, THREADS)
    } else {
        Ok(convert::default_threads())
    }
}

fn transforms(matches: &ArgMatches) -> Result<IfsEngine, Error> {
    let mut ifs = IfsEngine::new();
    for s in matches.values_of(TRANSFORM).into_iter().flatten() {
        match parse_transform(s) {
            Some((t, p)) => ifs.add_weighted_transform(t, p),
            None => bail!("Could not parse transform {}", s),
        };
    }
    Ok(ifs)
}

fn finished<T>(result: Generated<T>) -> Result<T, Error> {
    match result {
        Generated::Complete(t) => Ok(t),
        Generated::Cancelled(_) => bail!("Generation was cancelled"),
    }
}

fn render_mandelbrot(matches: &ArgMatches, cancel: &CancellationToken) -> Result<(), Error> {
    let size = image_size(matches)?;
    let leftlower = matches
        .value_of(LEFTLOWER)
        .and_then(parse_complex)
        .ok_or_else(|| failure::err_msg("Error parsing left lower point"))?;
    let rightupper = matches
        .value_of(RIGHTUPPER)
        .and_then(parse_complex)
        .ok_or_else(|| failure::err_msg("Error parsing right upper point"))?;
    let iterations: u32 = value(matches, ITERATIONS)?;

    let engine = escape::EscapeTimeEngine::new(size.0, size.1, leftlower, rightupper, iterations)?;
    let grid = finished(engine.compute(cancel))?;
    let max_iter = u64::from(grid.max_iter());
    // Flip so the maximum imaginary row lands at the top of the image.
    let pixels: Vec<u8> = grid
        .rows()
        .rev()
        .flat_map(|row| row.iter())
        .map(|&n| clamp((u64::from(n) * 255) / max_iter, 0, 255) as u8)
        .collect();
    write_image(value::<String>(matches, OUTPUT)?.as_str(), &pixels, size)
}

fn render_cloud(matches: &ArgMatches, points: &[Point]) -> Result<(), Error> {
    let size = image_size(matches)?;
    let DisplayBuffers { xs, ys } = convert::to_display_buffers(points, threads(matches)?)?;
    let coords = || xs.iter().zip(ys.iter()).map(|(&x, &y)| (f64::from(x), f64::from(y)));
    let mut canvas = Canvas::fitted(coords(), size)?;
    for (x, y) in coords() {
        canvas.plot(x, y);
    }
    write_image(value::<String>(matches, OUTPUT)?.as_str(), &canvas.pixelate(), size)
}

fn render_ifs(
    matches: &ArgMatches,
    ifs: &IfsEngine,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    let report = ifs.check_contraction()?;
    println!("{}", report);
    if !report.is_guaranteed_fractal {
        tracing::warn!("the system is not guaranteed to converge; generating anyway");
    }
    let n: usize = value(matches, POINTS)?;
    let points = finished(ifs.generate_seeded(n, seed(matches)?, cancel)?)?;
    if points.is_empty() {
        bail!("No points landed inside the drawable region; check the transforms");
    }
    render_cloud(matches, &points)
}

fn render_chaos(matches: &ArgMatches, cancel: &CancellationToken) -> Result<(), Error> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let n: usize = value(matches, POINTS)?;
    let mut rng = StdRng::seed_from_u64(seed(matches)?);
    let points = finished(chaos::sierpinski_chaos(n, &mut rng, cancel))?;
    render_cloud(matches, &points)
}

fn render_koch(matches: &ArgMatches, cancel: &CancellationToken) -> Result<(), Error> {
    let size = image_size(matches)?;
    let order: i32 = value(matches, ORDER)?;
    let side: f64 = value(matches, SIDE)?;
    let points = finished(subdivision::koch(order, side, cancel)?)?;

    let mut canvas = Canvas::fitted(points.iter().map(|p| (p.x, p.y)), size)?;
    for (from, to) in points.iter().tuple_windows() {
        canvas.line(*from, *to);
    }
    write_image(value::<String>(matches, OUTPUT)?.as_str(), &canvas.pixelate(), size)
}

fn render_sierpinski(matches: &ArgMatches, cancel: &CancellationToken) -> Result<(), Error> {
    let size = image_size(matches)?;
    let order: i32 = value(matches, ORDER)?;
    let triangles = finished(subdivision::sierpinski(order, cancel)?)?;

    let vertices = triangles.iter().flat_map(|t| t.vertices().to_vec());
    let mut canvas = Canvas::fitted(vertices.map(|p| (p.x, p.y)), size)?;
    for triangle in &triangles {
        for (from, to) in triangle.outline().iter().tuple_windows() {
            canvas.line(*from, *to);
        }
    }
    write_image(value::<String>(matches, OUTPUT)?.as_str(), &canvas.pixelate(), size)
}

fn check(matches: &ArgMatches) -> Result<(), Error> {
    let report = contraction::analyze(&transforms(matches)?.transforms())?;
    println!("{}", report);
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    // Nothing in the shell sets this.
    let cancel = CancellationToken::new();
    match matches.subcommand() {
        ("mandelbrot", Some(m)) => render_mandelbrot(m, &cancel),
        ("fern", Some(m)) => render_ifs(m, &presets::barnsley_fern(), &cancel),
        ("ifs", Some(m)) => render_ifs(m, &transforms(m)?, &cancel),
        ("chaos", Some(m)) => render_chaos(m, &cancel),
        ("koch", Some(m)) => render_koch(m, &cancel),
        ("sierpinski", Some(m)) => render_sierpinski(m, &cancel),
        ("check", Some(m)) => check(m),
        _ => bail!("No fractal selected"),
    }
}

fn main() {
    let matches = args();
    let verbose = matches.is_present(VERBOSE)
        || matches
            .subcommand()
            .1
            .map_or(false, |m| m.is_present(VERBOSE));
    init_logging(verbose);
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
