use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pge_file_formats::escape::{escape, unescape};
use pge_file_formats::world::{LevelTile, MapTile, MusicBox};
use pge_file_formats::{pgex, read_world, write_world, FileFormat, WorldData, WriteOptions};

fn sample_world(size: usize) -> WorldData {
    let mut world = WorldData {
        title: "Benchmark world".to_string(),
        credits: "Ann\nBo".to_string(),
        stars: 120,
        ..WorldData::default()
    };
    for i in 0..size as i64 {
        world.tiles.push(MapTile {
            id: (i % 30) as u32 + 1,
            x: i * 32,
            y: (i % 17) * 32,
            ..MapTile::default()
        });
        if i % 4 == 0 {
            world.scenery.push(MapTile {
                id: 5,
                x: i * 32,
                y: 0,
                ..MapTile::default()
            });
        }
        if i % 10 == 0 {
            world.levels.push(LevelTile {
                id: 2,
                x: i * 32,
                y: 64,
                file: format!("level-{i}.lvl"),
                title: format!("Level {i}"),
                ..LevelTile::default()
            });
        }
    }
    world.music_boxes.push(MusicBox {
        id: 3,
        ..MusicBox::default()
    });
    world
}

fn benchmark_escape(c: &mut Criterion) {
    let text = "Line one; \"quoted\": [a, b]\nLine two 100%";
    let escaped = escape(text, true);

    c.bench_function("escape", |b| b.iter(|| escape(black_box(text), true)));
    c.bench_function("unescape", |b| b.iter(|| unescape(black_box(&escaped), true)));
}

fn benchmark_pgex_parse(c: &mut Criterion) {
    let options = WriteOptions::new();
    let text = write_world(&sample_world(500), &options).unwrap();

    c.bench_function("pgex_parse_tree", |b| b.iter(|| pgex::parse(black_box(&text))));
}

fn benchmark_write_world(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_world");
    let world = sample_world(200);

    for format in [FileFormat::Pgex, FileFormat::Smbx64, FileFormat::Smbx38a] {
        let options = WriteOptions::new().with_format(format);
        group.bench_with_input(BenchmarkId::from_parameter(format), &options, |b, options| {
            b.iter(|| write_world(black_box(&world), options))
        });
    }
    group.finish();
}

fn benchmark_read_world(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_world");

    for size in [10, 100, 1000] {
        let world = sample_world(size);
        for format in [FileFormat::Pgex, FileFormat::Smbx64, FileFormat::Smbx38a] {
            let text = write_world(&world, &WriteOptions::new().with_format(format)).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format.name(), size),
                &text,
                |b, text| b.iter(|| read_world(black_box(text))),
            );
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_escape,
    benchmark_pgex_parse,
    benchmark_write_world,
    benchmark_read_world
);
criterion_main!(benches);
