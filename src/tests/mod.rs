

// Local runtime tests
mod runtime;

// Shape declaration and class synthesis tests
mod shape;

// Insert/extract round trips
mod insert_extract;



// Serializer tests
mod serializers;
