use dkmeans::*;

fn main() {
    let (element_cnt, element_dims, k, workers) = (20000, 32, 4, 3);

    // Generate some random data
    let mut elements = vec![0u8; element_cnt * element_dims];
    elements.iter_mut().for_each(|v| *v = rand::random());

    spawn_group(workers, |comm| {
        let rank = comm.rank();
        let init_done = |c: &Centroids| println!("[{}] Initialization completed, centroid 0: {:?}", rank, c.get(0));
        let iteration_done = |c: &Centroids, nr: usize| {
            if rank == 0 {
                println!("Generation {} - centroid 0: {:?}", nr, c.get(0));
            }
        };
        let conf = KMeansConfig::build()
            .init_done(&init_done)
            .iteration_done(&iteration_done)
            .max_iter(50)
            .build();

        let mut kmean = KMeans::new(comm, k, element_dims, SquaredEuclideanDistance).unwrap();
        let report = if rank == 0 {
            kmean.fit(&elements, element_cnt, init_random_sample, &conf)
        } else {
            kmean.fit_work(&conf)
        }.unwrap();
        if rank == 0 {
            println!("{:?} after {} generations", report.status, report.generations);
            for (i, c) in kmean.clusters().iter().enumerate() {
                println!("Cluster {}: {} elements", i, c.elements.len());
            }
        }
    });
}
