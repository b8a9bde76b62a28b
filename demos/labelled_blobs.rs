use dkmeans::*;
use rand::prelude::*;

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let (element_cnt, element_dims, k, workers) = (6000, 64, 10, 4);

    // Generate labelled data: noisy copies of one random prototype per label
    let mut rnd = StdRng::seed_from_u64(2024);
    let mut prototypes = vec![0u8; k * element_dims];
    prototypes.iter_mut().for_each(|v| *v = rnd.gen());
    let mut elements = vec![0u8; element_cnt * element_dims];
    let mut labels = vec![0u8; element_cnt];
    for (element, label) in elements.chunks_exact_mut(element_dims).zip(labels.iter_mut()) {
        *label = rnd.gen_range(0..k as u8);
        let proto = &prototypes[*label as usize * element_dims..][..element_dims];
        element.iter_mut().zip(proto).for_each(|(v, &p)| {
            *v = (i16::from(p) + rnd.gen_range(-40..=40)).clamp(0, 255) as u8;
        });
    }

    let results = spawn_group(workers, |comm| {
        let root = comm.rank() == 0;
        let mut kmean = KMeans::new(comm, k, element_dims, EuclideanDistance).unwrap();
        let conf = KMeansConfig::build()
            .random_generator(StdRng::seed_from_u64(7))
            .build();
        let report = if root {
            kmean.fit(&elements, element_cnt, init_random_sample, &conf)
        } else {
            kmean.fit_work(&conf)
        }.unwrap();
        (report, kmean.clusters().to_vec())
    });

    let (report, clusters) = &results[0];
    println!("{:?} after {} generations", report.status, report.generations);
    for (i, cluster) in clusters.iter().enumerate() {
        match majority_label(cluster, &labels) {
            Some((label, freq)) => println!(
                "Cluster {}: {} elements, majority label {} ({:.1}%)",
                i, cluster.elements.len(), label, 100.0 * freq as f64 / cluster.elements.len() as f64
            ),
            None => println!("Cluster {}: empty", i),
        }
    }
    if let Some(purity) = cluster_purity(clusters, &labels) {
        println!("Purity: {:.3}", purity);
    }
}
