mod proj;
