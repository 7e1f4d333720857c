extern crate plotters;
use plotters::prelude::*;

extern crate retime;
use retime::{BezierCurve, BezierSegment, ControlPoint, NativeFloat};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // an ease-in/ease-out retime over ten frames, held flat for two more
    let warp = BezierCurve::new(vec![
        BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(4.0, 0.0),
            ControlPoint::new(6.0, 10.0),
            ControlPoint::new(10.0, 10.0),
        ),
        BezierSegment::new(
            ControlPoint::new(10.0, 10.0),
            ControlPoint::new(10.6667, 10.0),
            ControlPoint::new(11.3333, 10.0),
            ControlPoint::new(12.0, 10.0),
        ),
    ]);

    let domain = warp.input_interval();
    let nsteps: usize = 1000;
    let mut warp_graph: Vec<(NativeFloat, NativeFloat)> = Vec::with_capacity(nsteps);
    for step in 0..nsteps {
        let x = domain.start + domain.length() * (step as NativeFloat) / (nsteps as NativeFloat);
        warp_graph.push((x, warp.evaluate(x)?));
    }

    // the same curve lowered to a monotonic polyline
    let polyline = warp.linearized();
    let knot_graph: Vec<(NativeFloat, NativeFloat)> = polyline
        .knots
        .iter()
        .map(|k| (k.input, k.output))
        .collect();

    let root = BitMapBackend::new("retime_curve.png", (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    // setup the chart
    let mut chart = ChartBuilder::on(&root)
        .caption("Retime Curve", ("sans-serif", 21).into_font())
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(domain.start - 1.0..domain.end + 1.0, -1.0f32..12.0f32)?;

    chart.configure_mesh().draw()?;

    // the curve as a function of the input ordinate
    chart
        .draw_series(LineSeries::new(warp_graph, &RED))?
        .label("warp(x)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    // its linearization knots
    chart
        .draw_series(PointSeries::of_element(
            knot_graph,
            2,
            &BLUE,
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))?
        .label("linearized knots")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}
