use bambu3mf::{ColorMode, ImportConfig, import};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const PAINT_CODES: [&str; 6] = ["1C", "2C", "3C", "1C2C", "4C", "0FC"];

/// Generate a painted package with `objects` grid objects of `vertices` vertices each
fn generate_package(objects: usize, vertices: usize) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
    let options = SimpleFileOptions::default();

    let mut slice_info = String::from("<config><plate>\n");
    for id in 1..=20 {
        slice_info.push_str(&format!(
            "<filament id=\"{}\" color=\"#{:02X}{:02X}{:02X}\"/>\n",
            id,
            id * 12,
            255 - id * 12,
            (id * 37) % 256
        ));
    }
    slice_info.push_str("</plate></config>");
    zip.start_file("Metadata/slice_info.config", options).unwrap();
    zip.write_all(slice_info.as_bytes()).unwrap();

    let triangles = vertices.saturating_sub(2);
    for object in 1..=objects {
        let mut model_xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <model unit=\"millimeter\" xmlns=\"http://schemas.microsoft.com/3dmanufacturing/core/2015/02\">\n\
             <resources><object id=\"{}\" type=\"model\"><mesh><vertices>\n",
            object
        );
        for i in 0..vertices {
            model_xml.push_str(&format!(
                "<vertex x=\"{}\" y=\"{}\" z=\"{}\"/>\n",
                i % 100,
                i / 100,
                (i % 7) as f64 * 0.5
            ));
        }
        model_xml.push_str("</vertices><triangles>\n");
        for i in 0..triangles {
            // Leave every fifth face unpainted
            if i % 5 == 0 {
                model_xml.push_str(&format!(
                    "<triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>\n",
                    i,
                    i + 1,
                    i + 2
                ));
            } else {
                model_xml.push_str(&format!(
                    "<triangle v1=\"{}\" v2=\"{}\" v3=\"{}\" paint_color=\"{}\"/>\n",
                    i,
                    i + 1,
                    i + 2,
                    PAINT_CODES[i % PAINT_CODES.len()]
                ));
            }
        }
        model_xml.push_str("</triangles></mesh></object></resources></model>");

        zip.start_file(format!("3D/Objects/object_{}.model", object), options)
            .unwrap();
        zip.write_all(model_xml.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    buffer
}

fn bench_import_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_modes");

    for &vertices in &[1_000, 10_000] {
        let data = generate_package(1, vertices);
        for (label, mode) in [("material", ColorMode::Material), ("vertex", ColorMode::Vertex)] {
            let config = ImportConfig::new().with_mode(mode);
            group.bench_with_input(
                BenchmarkId::new(label, format!("{}v", vertices)),
                &data,
                |b, data| {
                    b.iter(|| black_box(import(Cursor::new(data.as_slice()), &config).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_import_many_objects(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_many_objects");
    group.sample_size(10);

    for &objects in &[8, 32] {
        let data = generate_package(objects, 5_000);
        let config = ImportConfig::default();
        group.bench_with_input(
            BenchmarkId::new("objects", objects),
            &data,
            |b, data| {
                b.iter(|| black_box(import(Cursor::new(data.as_slice()), &config).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_import_modes, bench_import_many_objects);
criterion_main!(benches);
